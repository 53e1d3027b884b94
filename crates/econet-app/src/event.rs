//! Events reported to the host.
//!
//! Receive events carry a [`BufferHandle`] rather than the frame bytes. The
//! host reads the frame from the shared pool and must release the handle
//! once it is done with it, or the engine runs out of receive buffers.

use econet_core::{BufferHandle, RxError, Scout, TxError};

use crate::command::Mode;

/// Engine loop counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    /// Events discarded because the event queue was full
    pub dropped_events: u64,
    /// Receive polls skipped because no buffer was free
    pub exhausted_claims: u64,
}

/// Status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Firmware version
    pub version: &'static str,
    /// Own station number
    pub station: u8,
    /// Raw status register 1 sample
    pub status_register: u8,
    /// Current mode
    pub mode: Mode,
    /// Loop counters at the time of the snapshot
    pub counters: Counters,
}

/// Outcome of a receive poll worth reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxEvent {
    /// Broadcast frame in `buffer`
    Broadcast {
        /// Frame bytes
        buffer: BufferHandle,
    },
    /// Immediate operation; data frame in `buffer`
    Immediate {
        /// Opening scout
        scout: Scout,
        /// Data frame bytes
        buffer: BufferHandle,
    },
    /// Four-way transfer; data frame in `buffer`
    Transmit {
        /// Opening scout
        scout: Scout,
        /// Data frame bytes
        buffer: BufferHandle,
        /// Id to quote in a reply, when deferred replies are on
        reply_id: Option<u16>,
    },
    /// Frame captured in monitor mode
    Monitor {
        /// Frame bytes
        buffer: BufferHandle,
    },
    /// Receive exchange failed
    Error(RxError),
}

impl RxEvent {
    /// Pool buffer owned by the event, if any.
    pub fn buffer(&self) -> Option<BufferHandle> {
        match self {
            Self::Broadcast { buffer }
            | Self::Immediate { buffer, .. }
            | Self::Transmit { buffer, .. }
            | Self::Monitor { buffer } => Some(*buffer),
            Self::Error(_) => None,
        }
    }
}

/// A message from the engine to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Answer to [`crate::Command::Status`]
    Status(StatusReport),
    /// Receive poll result
    Rx(RxEvent),
    /// Result of a transmit or broadcast
    Tx(Result<(), TxError>),
    /// Result of a reply
    Reply(Result<(), TxError>),
}

impl Event {
    /// Pool buffer owned by the event, if any.
    pub fn buffer(&self) -> Option<BufferHandle> {
        match self {
            Self::Rx(rx) => rx.buffer(),
            Self::Status(_) | Self::Tx(_) | Self::Reply(_) => None,
        }
    }
}
