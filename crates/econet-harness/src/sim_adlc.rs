//! Simulated link controller.
//!
//! Models the parts of the ADLC the engine relies on:
//!
//! - Inbound frames are delivered one at a time. Before the first byte is
//!   read Status-2 shows `ADDR_PRESENT`; while more than one byte remains it
//!   shows `RDA`; with one byte left it shows `FRAME_VALID`. Reading the last
//!   byte completes the frame and the next queued frame is presented.
//!   Status-1 `S2_RD_REQ` mirrors any Status-2 condition.
//! - Writing Control-1 with `RX_RESET` or `RX_FRAME_DISCONTINUE` discards a
//!   frame that has been partly read. A frame whose address has not been
//!   read yet survives.
//! - The transmitter is always ready (`TDRA`) unless jammed. Bytes written to
//!   the FIFO accumulate until Control-2 `TX_LAST_DATA`, which completes the
//!   frame, records it, asserts the interrupt line and hands it to the
//!   responder. `CLEAR_TX_STATUS` drops the interrupt and any partial frame.
//!
//! Every register access advances the shared [`SimClock`] by one tick, so
//! polling loops consume virtual time at a fixed rate.
//!
//! `SimAdlc` is a cheap handle; clones share one controller. Tests keep a
//! clone to script frames and inspect what the engine did.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use econet_core::{
    Adlc, ReadRegister, WriteRegister,
    adlc::{Control1, Control2, Status1, Status2},
};
use tracing::trace;

use crate::sim_clock::SimClock;

/// Virtual time consumed by one register access.
pub const DEFAULT_TICK: Duration = Duration::from_micros(10);

/// Receive-side fault injected into an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RxFault {
    /// Frame check sequence error
    Crc,
    /// FIFO overrun
    Overrun,
    /// Abort sequence
    Abort,
    /// Carrier lost
    CarrierLoss,
    /// Bytes stop arriving
    Stall,
}

impl RxFault {
    fn status(self) -> Status2 {
        match self {
            Self::Crc => Status2::FCS_ERROR,
            Self::Overrun => Status2::RX_OVERRUN,
            Self::Abort => Status2::RX_ABORT,
            Self::CarrierLoss => Status2::NOT_DCD,
            Self::Stall => Status2::empty(),
        }
    }
}

/// Transmit-side fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxFault {
    /// Transmitter never reports ready
    Jammed,
    /// Underrun once this many bytes have been written
    UnderrunAfter(usize),
    /// Frame is lost and completion is never signalled
    NoCompletion,
    /// Interrupt raised but frame-complete status missing
    CompletionWithoutStatus,
}

/// A frame queued for the engine to receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Frame bytes, address first
    pub bytes: Vec<u8>,
    /// Fault raised once this many bytes have been read
    pub fault: Option<(usize, RxFault)>,
}

impl InboundFrame {
    /// A clean frame.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), fault: None }
    }

    /// Raise `fault` after `after` bytes have been read (at least one).
    #[must_use]
    pub fn with_fault(mut self, after: usize, fault: RxFault) -> Self {
        self.fault = Some((after.max(1), fault));
        self
    }
}

impl From<Vec<u8>> for InboundFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Produces the frames a remote station sends back after seeing one of ours.
///
/// Called with the controller locked: it must not use the `SimAdlc`.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<InboundFrame> + Send>;

#[derive(Debug)]
struct Receiving {
    frame: InboundFrame,
    cursor: usize,
}

impl Receiving {
    fn status(&self) -> Status2 {
        if let Some((after, fault)) = self.frame.fault
            && self.cursor >= after
        {
            return fault.status();
        }
        let remaining = self.frame.bytes.len().saturating_sub(self.cursor);
        if self.cursor == 0 {
            Status2::ADDR_PRESENT
        } else if remaining == 1 {
            Status2::FRAME_VALID
        } else if remaining > 1 {
            Status2::RDA
        } else {
            Status2::empty()
        }
    }
}

struct State {
    clock: SimClock,
    tick: Duration,

    inbound: VecDeque<InboundFrame>,
    current: Option<Receiving>,
    stray_status2: Status2,
    stray_rda: bool,

    cr1: Control1,
    cr2: Control2,
    writes: Vec<(WriteRegister, u8)>,
    fifo_reads: usize,
    resets: usize,

    tx_buffer: Vec<u8>,
    tx_irq: bool,
    tx_status_lost: bool,
    tx_fault: Option<TxFault>,
    sent: Vec<Vec<u8>>,

    loopback: bool,
    responder: Option<Responder>,
}

impl State {
    fn new(clock: SimClock) -> Self {
        Self {
            clock,
            tick: DEFAULT_TICK,
            inbound: VecDeque::new(),
            current: None,
            stray_status2: Status2::empty(),
            stray_rda: false,
            cr1: Control1::empty(),
            cr2: Control2::empty(),
            writes: Vec::new(),
            fifo_reads: 0,
            resets: 0,
            tx_buffer: Vec::new(),
            tx_irq: false,
            tx_status_lost: false,
            tx_fault: None,
            sent: Vec::new(),
            loopback: false,
            responder: None,
        }
    }

    fn step(&mut self) {
        self.clock.advance(self.tick);
        if self.current.is_none() {
            self.current = self.inbound.pop_front().map(|frame| Receiving { frame, cursor: 0 });
        }
    }

    fn status2(&self) -> Status2 {
        match &self.current {
            Some(rx) => rx.status(),
            None => self.stray_status2,
        }
    }

    fn status1(&self) -> Status1 {
        let mut status = Status1::empty();
        if !self.status2().is_empty() {
            status |= Status1::S2_RD_REQ;
        }
        if self.stray_rda {
            status |= Status1::RDA;
        }
        if self.tx_fault != Some(TxFault::Jammed) && !self.tx_status_lost {
            status |= Status1::TDRA;
        }
        if let Some(TxFault::UnderrunAfter(limit)) = self.tx_fault {
            let transmitting = !self.cr1.contains(Control1::RIE);
            if transmitting && self.tx_buffer.len() >= limit {
                status |= Status1::TX_UNDERRUN;
            }
        }
        if self.irq() {
            status |= Status1::IRQ;
        }
        status
    }

    fn irq(&self) -> bool {
        let rx_pending = !self.status2().is_empty() || self.stray_rda;
        self.tx_irq || (self.cr1.contains(Control1::RIE) && rx_pending)
    }

    fn read_fifo(&mut self) -> u8 {
        self.fifo_reads += 1;
        let Some(rx) = self.current.as_mut() else {
            return 0;
        };
        let byte = rx.frame.bytes.get(rx.cursor).copied().unwrap_or(0);
        rx.cursor += 1;
        if rx.cursor >= rx.frame.bytes.len() {
            self.current = None;
        }
        byte
    }

    fn write_cr1(&mut self, value: Control1) {
        self.cr1 = value;
        if value.intersects(Control1::RX_RESET | Control1::RX_FRAME_DISCONTINUE) {
            if self.current.as_ref().is_some_and(|rx| rx.cursor > 0) {
                trace!("partial inbound frame discarded");
                self.current = None;
            }
            self.stray_rda = false;
        }
    }

    fn write_cr2(&mut self, value: Control2) {
        self.cr2 = value;
        if value.contains(Control2::CLEAR_RX_STATUS) {
            self.stray_status2 = Status2::empty();
        }
        if value.contains(Control2::CLEAR_TX_STATUS) {
            self.tx_irq = false;
            self.tx_status_lost = false;
            self.tx_buffer.clear();
        }
        if value.contains(Control2::TX_LAST_DATA) {
            self.complete_frame();
        }
    }

    fn complete_frame(&mut self) {
        let frame = std::mem::take(&mut self.tx_buffer);
        match self.tx_fault {
            Some(TxFault::NoCompletion) => return,
            Some(TxFault::CompletionWithoutStatus) => self.tx_status_lost = true,
            _ => {},
        }
        self.tx_irq = true;

        if let Some(responder) = self.responder.as_mut() {
            self.inbound.extend(responder(&frame));
        }
        if self.loopback {
            self.inbound.push_back(InboundFrame::new(frame.clone()));
        }
        self.sent.push(frame);
    }
}

/// Simulated link controller.
#[derive(Clone)]
pub struct SimAdlc {
    state: Arc<Mutex<State>>,
    clock: SimClock,
}

impl fmt::Debug for SimAdlc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimAdlc").field("clock", &self.clock).finish_non_exhaustive()
    }
}

impl SimAdlc {
    /// Controller advancing `clock` on every register access.
    pub fn new(clock: SimClock) -> Self {
        Self { state: Arc::new(Mutex::new(State::new(clock.clone()))), clock }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The clock this controller advances.
    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }

    /// Virtual time consumed per register access.
    pub fn set_tick(&self, tick: Duration) {
        self.lock().tick = tick;
    }

    /// Queue a frame for the engine to receive.
    pub fn push_inbound(&self, frame: impl Into<InboundFrame>) {
        self.lock().inbound.push_back(frame.into());
    }

    /// Frames queued but not yet presented.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Whether a frame is being presented to the engine.
    pub fn receiving(&self) -> bool {
        self.lock().current.is_some()
    }

    /// Install the remote station's behaviour.
    pub fn set_responder(&self, responder: impl FnMut(&[u8]) -> Vec<InboundFrame> + Send + 'static) {
        self.lock().responder = Some(Box::new(responder));
    }

    /// Feed every transmitted frame back to the receiver.
    pub fn set_loopback(&self, loopback: bool) {
        self.lock().loopback = loopback;
    }

    /// Inject (or clear) a transmit fault.
    pub fn set_tx_fault(&self, fault: Option<TxFault>) {
        self.lock().tx_fault = fault;
    }

    /// Raise a Status-2 condition outside any frame.
    pub fn inject_status2(&self, status: Status2) {
        self.lock().stray_status2 = status;
    }

    /// Raise Status-1 `RDA` outside any frame.
    pub fn inject_stray_data(&self) {
        self.lock().stray_rda = true;
    }

    /// Frames transmitted so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Every register write so far, FIFO included.
    pub fn writes(&self) -> Vec<(WriteRegister, u8)> {
        self.lock().writes.clone()
    }

    /// Number of register writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// Number of receive FIFO reads so far.
    pub fn fifo_reads(&self) -> usize {
        self.lock().fifo_reads
    }

    /// Number of hardware resets.
    pub fn resets(&self) -> usize {
        self.lock().resets
    }

    /// Last value written to Control-1.
    pub fn cr1(&self) -> Control1 {
        self.lock().cr1
    }

    /// Last value written to Control-2.
    pub fn cr2(&self) -> Control2 {
        self.lock().cr2
    }

    /// Whether the controller is back in its listening state: receive
    /// interrupts on and the last Control-2 write cleared both status sets.
    pub fn is_listening(&self) -> bool {
        let state = self.lock();
        state.cr1.contains(Control1::RIE)
            && state.cr2.contains(Control2::CLEAR_RX_STATUS | Control2::CLEAR_TX_STATUS)
    }

    /// Whether flag fill is held after the last Control-2 write.
    pub fn flag_fill(&self) -> bool {
        self.lock().cr2.contains(Control2::FLAG_IDLE)
    }
}

impl Adlc for SimAdlc {
    fn read(&mut self, register: ReadRegister) -> u8 {
        let mut state = self.lock();
        state.step();
        match register {
            ReadRegister::Status1 => state.status1().bits(),
            ReadRegister::Status2 => state.status2().bits(),
            ReadRegister::Fifo => state.read_fifo(),
        }
    }

    fn write(&mut self, register: WriteRegister, value: u8) {
        let mut state = self.lock();
        state.step();
        state.writes.push((register, value));
        match register {
            WriteRegister::Control1 => state.write_cr1(Control1::from_bits_retain(value)),
            WriteRegister::Control2 => state.write_cr2(Control2::from_bits_retain(value)),
            WriteRegister::Control3 | WriteRegister::Control4 => {},
            WriteRegister::Fifo => state.tx_buffer.push(value),
        }
    }

    fn reset(&mut self) {
        let mut state = self.lock();
        state.step();
        state.resets += 1;
        state.current = None;
        state.stray_status2 = Status2::empty();
        state.stray_rda = false;
        state.tx_buffer.clear();
        state.tx_irq = false;
        state.tx_status_lost = false;
    }

    fn irq(&mut self) -> bool {
        let mut state = self.lock();
        state.step();
        state.irq()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim() -> SimAdlc {
        SimAdlc::new(SimClock::new())
    }

    fn status2(adlc: &mut SimAdlc) -> Status2 {
        Status2::from_bits_retain(adlc.read(ReadRegister::Status2))
    }

    #[test]
    fn inbound_frame_status_sequence() {
        let mut adlc = sim();
        adlc.push_inbound(vec![1, 2, 3]);

        assert_eq!(status2(&mut adlc), Status2::ADDR_PRESENT);
        assert_eq!(adlc.read(ReadRegister::Fifo), 1);
        assert_eq!(status2(&mut adlc), Status2::RDA);
        assert_eq!(adlc.read(ReadRegister::Fifo), 2);
        assert_eq!(status2(&mut adlc), Status2::FRAME_VALID);
        assert_eq!(adlc.read(ReadRegister::Fifo), 3);
        assert!(!adlc.receiving());
        assert_eq!(status2(&mut adlc), Status2::empty());
    }

    #[test]
    fn fault_replaces_status() {
        let mut adlc = sim();
        adlc.push_inbound(InboundFrame::new(vec![1, 2, 3, 4]).with_fault(2, RxFault::Crc));

        adlc.read(ReadRegister::Fifo);
        assert_eq!(status2(&mut adlc), Status2::RDA);
        adlc.read(ReadRegister::Fifo);
        assert_eq!(status2(&mut adlc), Status2::FCS_ERROR);
    }

    #[test]
    fn rx_reset_discards_partial_frame_only() {
        let mut adlc = sim();
        adlc.push_inbound(vec![1, 2, 3]);
        adlc.read(ReadRegister::Status1);

        adlc.write_cr1(Control1::RIE | Control1::RX_RESET);
        assert!(adlc.receiving());

        adlc.read(ReadRegister::Fifo);
        adlc.write_cr1(Control1::RIE | Control1::RX_RESET);
        assert!(!adlc.receiving());
    }

    #[test]
    fn last_data_completes_frame() {
        let mut adlc = sim();
        adlc.set_responder(|frame| vec![InboundFrame::new(frame.to_vec())]);

        for byte in [9, 8, 7] {
            adlc.write(WriteRegister::Fifo, byte);
        }
        adlc.write_cr2(Control2::TX_LAST_DATA | Control2::FRAME_COMPLETE);

        assert_eq!(adlc.sent(), vec![vec![9, 8, 7]]);
        assert!(adlc.irq());
        assert_eq!(adlc.pending_inbound() + usize::from(adlc.receiving()), 1);

        adlc.write_cr2(Control2::CLEAR_TX_STATUS);
        assert!(!adlc.status1().contains(Status1::IRQ));
    }

    #[test]
    fn every_access_advances_clock() {
        let mut adlc = sim();
        let clock = adlc.clock();
        adlc.read(ReadRegister::Status1);
        adlc.write(WriteRegister::Control1, 0);
        adlc.irq();
        assert_eq!(clock.elapsed(), DEFAULT_TICK * 3);
    }

    #[test]
    fn jammed_transmitter_never_ready() {
        let mut adlc = sim();
        adlc.set_tx_fault(Some(TxFault::Jammed));
        assert!(!adlc.status1().contains(Status1::TDRA));
        adlc.set_tx_fault(None);
        assert!(adlc.status1().contains(Status1::TDRA));
    }
}
