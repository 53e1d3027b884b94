//! Virtual clock.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use econet_core::Clock;

/// Monotonic clock that only moves when told to.
///
/// Clones share the same time, so the simulated controller can advance the
/// clock the engine reads.
#[derive(Debug, Clone)]
pub struct SimClock {
    base: Instant,
    elapsed_nanos: Arc<AtomicU64>,
}

impl SimClock {
    /// Clock starting at the current instant.
    pub fn new() -> Self {
        Self { base: Instant::now(), elapsed_nanos: Arc::new(AtomicU64::new(0)) }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::Relaxed))
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}
