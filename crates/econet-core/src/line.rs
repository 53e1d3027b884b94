//! Frame I/O over the link controller.
//!
//! [`Line`] owns the controller and the clock and provides the two frame
//! primitives the handshake is built from, [`Line::read_frame`] and
//! [`Line::tx_frame`], plus the composite control-register sequences that
//! put the controller into each state.
//!
//! # Controller state after each primitive
//!
//! - `read_frame` returning [`ReadOutcome::Ok`] clears receive status,
//!   optionally keeping flag fill. On any other outcome the controller is
//!   left untouched and the caller decides (normally [`Line::abort_read`]).
//! - `tx_frame` always finishes with transmit status cleared and receive
//!   interrupts enabled, on every path. Flag fill is kept only when the
//!   caller asked for it and the frame went out.

use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

use tracing::trace;

use crate::{
    adlc::{
        Adlc, Control1, Control2, Control3, Control4, ReadRegister, Status1, Status2,
        WriteRegister,
    },
    env::Clock,
    error::TxError,
    poll::{Deadline, poll_until},
};

/// Result of reading one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Frame complete; holds its length
    Ok(usize),
    /// First byte matched none of the accepted station numbers
    NoAddressMatch,
    /// Frame check sequence error
    CrcError,
    /// Receive FIFO overrun
    OverrunError,
    /// Abort sequence received
    AbortError,
    /// Frame did not complete before the deadline
    Timeout,
    /// Frame longer than the destination buffer
    Overflow,
    /// Carrier lost mid-frame
    Unexpected,
}

impl ReadOutcome {
    /// Whether a complete frame was read.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Result of sending one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Frame sent
    Ok,
    /// Transmitter underrun mid-frame
    Underrun,
    /// Controller did not become ready (or finish) before the deadline
    ReadyTimeout,
    /// Frame did not fit the buffer it was built in
    Overflow,
    /// Interrupt raised without frame-complete status
    Unexpected,
}

impl WriteOutcome {
    /// Map onto the transmit error taxonomy.
    pub fn into_result(self) -> Result<(), TxError> {
        match self {
            Self::Ok => Ok(()),
            Self::Underrun => Err(TxError::Underrun),
            Self::ReadyTimeout => Err(TxError::LineJammed),
            Self::Overflow => Err(TxError::Overflow),
            Self::Unexpected => Err(TxError::Misc),
        }
    }
}

const CLEAR_STATUS: Control2 = Control2::CLEAR_TX_STATUS
    .union(Control2::CLEAR_RX_STATUS)
    .union(Control2::PRIO_STATUS);

fn with_flag_fill(value: Control2, flag_fill: bool) -> Control2 {
    if flag_fill { value | Control2::FLAG_IDLE } else { value }
}

fn finish_tx<A: Adlc + ?Sized>(adlc: &mut A, flag_fill: bool) {
    adlc.write_cr2(with_flag_fill(CLEAR_STATUS, flag_fill));
    adlc.write_cr1(Control1::RIE | Control1::RX_RESET);
}

/// Exclusive use of the controller for one outgoing frame.
///
/// Dropping the session finalises the transmitter, so every exit from
/// [`Line::tx_frame`] leaves the controller listening.
struct TxSession<'a, A: Adlc> {
    adlc: &'a mut A,
    flag_fill: bool,
}

impl<'a, A: Adlc> TxSession<'a, A> {
    fn begin(adlc: &'a mut A) -> Self {
        adlc.write_cr1(Control1::empty());
        Self { adlc, flag_fill: false }
    }

    fn completed(&mut self, flag_fill: bool) {
        self.flag_fill = flag_fill;
    }
}

impl<A: Adlc> Deref for TxSession<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        self.adlc
    }
}

impl<A: Adlc> DerefMut for TxSession<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        self.adlc
    }
}

impl<A: Adlc> Drop for TxSession<'_, A> {
    fn drop(&mut self) {
        finish_tx(self.adlc, self.flag_fill);
    }
}

/// The link controller plus the clock its waits are measured against.
#[derive(Debug)]
pub struct Line<A, C> {
    adlc: A,
    clock: C,
}

impl<A: Adlc, C: Clock> Line<A, C> {
    /// Wrap a controller. Does not touch it; call [`Line::init`].
    pub fn new(adlc: A, clock: C) -> Self {
        Self { adlc, clock }
    }

    /// The clock deadlines are taken from.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The controller.
    pub fn adlc(&self) -> &A {
        &self.adlc
    }

    /// Release the controller and clock.
    pub fn into_parts(self) -> (A, C) {
        (self.adlc, self.clock)
    }

    /// Put the controller into its listening configuration.
    pub fn init(&mut self) {
        self.adlc.write_cr1(Control1::TX_RESET | Control1::RX_RESET);
        self.adlc.write_cr3(Control3::empty());
        self.adlc.write_cr4(Control4::EIGHT_BIT_WORDS);
        self.irq_reset();
    }

    /// Pulse the hardware reset and re-initialise.
    pub fn reset(&mut self) {
        self.adlc.reset();
        self.init();
    }

    /// Read status register 1.
    pub fn status1(&mut self) -> Status1 {
        self.adlc.status1()
    }

    /// Read status register 2.
    pub fn status2(&mut self) -> Status2 {
        self.adlc.status2()
    }

    /// Clear all status and enable receive interrupts.
    pub fn irq_reset(&mut self) {
        self.adlc.write_cr1(Control1::RIE);
        self.adlc.write_cr2(CLEAR_STATUS);
    }

    /// Discard the frame being received.
    pub fn abort_read(&mut self) {
        self.adlc.write_cr2(CLEAR_STATUS | Control2::FLAG_IDLE | Control2::TWO_BYTE);
        self.adlc.write_cr1(
            Control1::RX_FRAME_DISCONTINUE | Control1::RIE | Control1::RX_RESET | Control1::TX_RESET,
        );
        self.adlc.write_cr1(Control1::RIE | Control1::TX_RESET);
    }

    /// Clear receive status after a complete frame.
    pub fn clear_rx(&mut self, flag_fill: bool) {
        self.adlc.write_cr2(with_flag_fill(CLEAR_STATUS, flag_fill));
        self.adlc.write_cr1(Control1::RIE | Control1::RX_RESET);
    }

    /// Keep the line claimed with flag fill between frames.
    pub fn hold_flag_fill(&mut self) {
        self.adlc.write_cr2(CLEAR_STATUS | Control2::FLAG_IDLE);
    }

    /// Stop flag fill and let the line go idle.
    pub fn release_flag_fill(&mut self) {
        self.adlc.write_cr2(CLEAR_STATUS);
    }

    /// Turn the line round to send an acknowledgement.
    pub fn prepare_ack(&mut self) {
        self.adlc.write_cr2(
            Control2::RTS | Control2::CLEAR_TX_STATUS | Control2::CLEAR_RX_STATUS | Control2::FLAG_IDLE,
        );
        self.adlc.write_cr1(
            Control1::TX_RESET | Control1::RX_RESET | Control1::RX_FRAME_DISCONTINUE | Control1::TIE,
        );
    }

    /// Wait for the controller to report the address byte of a new frame.
    ///
    /// Status conditions other than an address are cleared and the wait
    /// continues. Returns false if no frame started before the timeout.
    pub fn wait_frame_start(&mut self, timeout: Duration) -> bool {
        let deadline = Deadline::after(&self.clock, timeout);
        loop {
            let requested = poll_until(&self.clock, deadline, || {
                self.adlc.status1().contains(Status1::S2_RD_REQ).then_some(())
            });
            if requested.is_none() {
                return false;
            }
            if self.adlc.status2().contains(Status2::ADDR_PRESENT) {
                return true;
            }
            self.irq_reset();
        }
    }

    /// Read one frame from the FIFO into `dest`.
    ///
    /// `dest` is cleared first and never holds more than `limit` bytes, the
    /// largest frame accepted. When `accept` is non-empty the first byte
    /// must equal one of its entries. `timeout` is measured from entry.
    pub fn read_frame(
        &mut self,
        dest: &mut Vec<u8>,
        limit: usize,
        accept: &[u8],
        timeout: Duration,
        flag_fill: bool,
    ) -> ReadOutcome {
        let deadline = Deadline::after(&self.clock, timeout);
        dest.clear();
        if limit == 0 {
            return ReadOutcome::Overflow;
        }

        let address = self.adlc.read(ReadRegister::Fifo);
        dest.push(address);
        if !accept.is_empty() && !accept.contains(&address) {
            return ReadOutcome::NoAddressMatch;
        }

        loop {
            let Some(status) = poll_until(&self.clock, deadline, || {
                let status = self.adlc.status2();
                status.intersects(Status2::FRAME_EVENTS).then_some(status)
            }) else {
                return ReadOutcome::Timeout;
            };

            if status.contains(Status2::RX_ABORT) {
                return ReadOutcome::AbortError;
            }
            if status.contains(Status2::FCS_ERROR) {
                return ReadOutcome::CrcError;
            }
            if status.contains(Status2::RX_OVERRUN) {
                return ReadOutcome::OverrunError;
            }
            if status.contains(Status2::NOT_DCD) {
                return ReadOutcome::Unexpected;
            }

            if status.intersects(Status2::RDA | Status2::FRAME_VALID) {
                if dest.len() >= limit {
                    return ReadOutcome::Overflow;
                }
                dest.push(self.adlc.read(ReadRegister::Fifo));
            }

            if status.contains(Status2::FRAME_VALID) {
                break;
            }
        }

        trace!(len = dest.len(), frame = %hex::encode(dest.as_slice()), "frame received");
        self.clear_rx(flag_fill);
        ReadOutcome::Ok(dest.len())
    }

    /// Send one frame.
    ///
    /// `timeout` bounds the whole write, from waiting for the transmitter to
    /// become ready to the completion interrupt. With `flag_fill` the line is
    /// kept claimed after a successful send, for a follow-up frame.
    pub fn tx_frame(&mut self, frame: &[u8], flag_fill: bool, timeout: Duration) -> WriteOutcome {
        let deadline = Deadline::after(&self.clock, timeout);
        let mut tx = TxSession::begin(&mut self.adlc);

        let ready = poll_until(&self.clock, deadline, || {
            if tx.status1().contains(Status1::TDRA) {
                return Some(());
            }
            tx.write_cr2(
                Control2::RTS
                    | Control2::CLEAR_TX_STATUS
                    | Control2::CLEAR_RX_STATUS
                    | Control2::FLAG_IDLE
                    | Control2::PRIO_STATUS,
            );
            None
        });
        if ready.is_none() {
            return WriteOutcome::ReadyTimeout;
        }

        for &byte in frame {
            let status = poll_until(&self.clock, deadline, || {
                let status = tx.status1();
                status.intersects(Status1::TDRA | Status1::TX_UNDERRUN).then_some(status)
            });
            match status {
                None => return WriteOutcome::ReadyTimeout,
                Some(status) if status.contains(Status1::TX_UNDERRUN) => {
                    return WriteOutcome::Underrun;
                },
                Some(_) => tx.write(WriteRegister::Fifo, byte),
            }
        }

        tx.write_cr2(
            Control2::TX_LAST_DATA | Control2::FRAME_COMPLETE | Control2::FLAG_IDLE | Control2::PRIO_STATUS,
        );
        tx.write_cr1(Control1::TIE);

        if poll_until(&self.clock, deadline, || tx.irq().then_some(())).is_none() {
            return WriteOutcome::ReadyTimeout;
        }
        if !tx.status1().contains(Status1::FRAME_COMPLETE) {
            return WriteOutcome::Unexpected;
        }

        trace!(len = frame.len(), frame = %hex::encode(frame), "frame sent");
        tx.completed(flag_fill);
        WriteOutcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_outcomes_map_to_tx_errors() {
        assert_eq!(WriteOutcome::Ok.into_result(), Ok(()));
        assert_eq!(WriteOutcome::Underrun.into_result(), Err(TxError::Underrun));
        assert_eq!(WriteOutcome::ReadyTimeout.into_result(), Err(TxError::LineJammed));
        assert_eq!(WriteOutcome::Overflow.into_result(), Err(TxError::Overflow));
        assert_eq!(WriteOutcome::Unexpected.into_result(), Err(TxError::Misc));
    }

    #[test]
    fn flag_fill_only_adds_flag_idle() {
        assert_eq!(with_flag_fill(CLEAR_STATUS, false), CLEAR_STATUS);
        assert_eq!(with_flag_fill(CLEAR_STATUS, true).bits(), 0x65);
    }
}
