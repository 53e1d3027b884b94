//! Error types for frame encoding.

use thiserror::Error;

/// Errors building a frame into a fixed-capacity buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Encoded frame would not fit in the buffer
    #[error("frame of {len} bytes exceeds buffer capacity of {capacity} bytes")]
    Overflow {
        /// Encoded length required
        len: usize,
        /// Capacity of the destination buffer
        capacity: usize,
    },
}
