//! Seeded random line faults.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::sim_adlc::{InboundFrame, RxFault};

const FAULTS: [RxFault; 5] =
    [RxFault::Crc, RxFault::Overrun, RxFault::Abort, RxFault::CarrierLoss, RxFault::Stall];

/// Corrupts a fraction of frames with a reproducible sequence of faults.
#[derive(Debug, Clone)]
pub struct LineNoise {
    rng: ChaCha8Rng,
    fault_rate: f64,
}

impl LineNoise {
    /// Noise corrupting roughly `fault_rate` of frames (0.0 to 1.0).
    pub fn new(seed: u64, fault_rate: f64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed), fault_rate: fault_rate.clamp(0.0, 1.0) }
    }

    /// Pass `bytes` through the noisy line.
    pub fn corrupt(&mut self, bytes: Vec<u8>) -> InboundFrame {
        if bytes.len() < 2 || !self.rng.gen_bool(self.fault_rate) {
            return InboundFrame::new(bytes);
        }
        let fault = FAULTS[self.rng.gen_range(0..FAULTS.len())];
        let after = self.rng.gen_range(1..bytes.len());
        InboundFrame::new(bytes).with_fault(after, fault)
    }
}
