//! Error types for the engine.
//!
//! Receive failures never abort the engine: they are reported in
//! [`crate::RxResult::Error`] and the controller is returned to listening.
//! Transmit-class operations return [`TxError`]. Only configuration and
//! buffer allocation can fail at startup.

use std::time::Duration;

use econet_proto::{FrameError, FrameHeader, FrameType};
use thiserror::Error;

/// Errors reported for a receive exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RxError {
    /// Frame check sequence mismatch
    #[error("frame check sequence error")]
    Crc,
    /// Receive FIFO overrun
    #[error("receiver overrun")]
    Overrun,
    /// Abort sequence received mid-frame
    #[error("frame aborted")]
    Abort,
    /// Frame or follow-up did not arrive in time
    #[error("timed out")]
    Timeout,
    /// Frame longer than the receive buffer
    #[error("frame exceeds receive buffer")]
    Overflow,
    /// Acknowledgement of the scout could not be sent
    #[error("failed to acknowledge scout")]
    ScoutAck,
    /// Acknowledgement of the data frame could not be sent
    #[error("failed to acknowledge data frame")]
    DataAck,
    /// Follow-up frame was not a data frame
    #[error("unexpected frame type")]
    UnexpectedFrame,
    /// Anything else (carrier loss mid-frame)
    #[error("receive failed")]
    Misc,
}

/// Errors reported for transmit, broadcast and reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum TxError {
    /// Frame does not fit in the transmit buffer
    #[error("frame exceeds transmit buffer")]
    Overflow,
    /// Transmitter ran out of data mid-frame
    #[error("transmitter underrun")]
    Underrun,
    /// Controller never became ready to send
    #[error("line jammed")]
    LineJammed,
    /// Scout was not acknowledged
    #[error("no scout acknowledgement")]
    NoScoutAck,
    /// Data frame was not acknowledged
    #[error("no data acknowledgement")]
    NoDataAck,
    /// Reply id does not match a live pending reply
    #[error("invalid receive id")]
    InvalidReceiveId,
    /// Anything else (frame completion not signalled)
    #[error("transmit failed")]
    Misc,
}

impl From<FrameError> for TxError {
    fn from(_: FrameError) -> Self {
        Self::Overflow
    }
}

/// Why waiting for an acknowledgement failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AckError {
    /// No frame addressed to this station arrived before the deadline
    #[error("no acknowledgement before deadline")]
    Timeout,
    /// A frame arrived but it was not the expected acknowledgement
    #[error("expected acknowledgement, got {frame_type:?} with header {header:?}")]
    Mismatch {
        /// Classification of the frame received
        frame_type: FrameType,
        /// Its address header, if it had one
        header: Option<FrameHeader>,
    },
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A buffer is smaller than the frames it must hold
    #[error("{buffer} buffer of {capacity} bytes is smaller than the required {required}")]
    BufferTooSmall {
        /// Which buffer
        buffer: &'static str,
        /// Configured capacity
        capacity: usize,
        /// Minimum capacity
        required: usize,
    },
    /// Station number is a broadcast marker
    #[error("station {0:#04x} is reserved for broadcast")]
    BroadcastStation(u8),
    /// A timeout is zero or unreasonably long
    #[error("{name} timeout of {timeout:?} is out of range")]
    TimeoutOutOfRange {
        /// Which timeout
        name: &'static str,
        /// Configured value
        timeout: Duration,
    },
}

/// Buffer pool construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Pool configured with no buffers or zero-sized buffers
    #[error("pool of {count} buffers of {size} bytes is empty")]
    Empty {
        /// Number of buffers requested
        count: usize,
        /// Size of each buffer
        size: usize,
    },
    /// Allocation failed
    #[error("failed to allocate {count} buffers of {size} bytes")]
    Allocation {
        /// Number of buffers requested
        count: usize,
        /// Size of each buffer
        size: usize,
    },
}
