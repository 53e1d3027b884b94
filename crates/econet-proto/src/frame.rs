//! Frame encoding into fixed-capacity buffers.
//!
//! Transmit buffers are allocated once at startup and reused for every
//! frame. The encoders check the final length against the buffer's capacity
//! before writing anything, so an oversized request leaves the buffer (and
//! the controller) untouched.

use crate::{
    classify::ScoutFields,
    errors::FrameError,
    header::{FrameHeader, HEADER_LEN, SCOUT_HEADER_LEN},
};

/// Encode a header-plus-payload frame (data, acknowledgement, broadcast).
///
/// `out` is cleared and refilled; `capacity` is the largest frame the caller
/// is prepared to send from it.
pub fn encode_data(
    out: &mut Vec<u8>,
    capacity: usize,
    header: FrameHeader,
    payload: &[u8],
) -> Result<(), FrameError> {
    let len = HEADER_LEN + payload.len();
    if len > capacity {
        return Err(FrameError::Overflow { len, capacity });
    }

    out.clear();
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

/// Encode a scout: header, control byte, port and optional extra bytes.
pub fn encode_scout(
    out: &mut Vec<u8>,
    capacity: usize,
    header: FrameHeader,
    scout: ScoutFields,
    extra: &[u8],
) -> Result<(), FrameError> {
    let len = SCOUT_HEADER_LEN + extra.len();
    if len > capacity {
        return Err(FrameError::Overflow { len, capacity });
    }

    out.clear();
    out.extend_from_slice(&header.to_bytes());
    out.push(scout.control);
    out.push(scout.port);
    out.extend_from_slice(extra);
    Ok(())
}
