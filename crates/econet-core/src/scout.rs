//! Received scout frames.

use std::{fmt, ops::Deref};

/// Longest scout the engine keeps, header and extra bytes included.
pub const MAX_SCOUT_LEN: usize = 32;

/// Opening scout of a received exchange, held inline.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Scout {
    bytes: [u8; MAX_SCOUT_LEN],
    len: usize,
}

impl Scout {
    /// Copy `frame`, or `None` if it is longer than [`MAX_SCOUT_LEN`].
    pub fn new(frame: &[u8]) -> Option<Self> {
        let mut bytes = [0; MAX_SCOUT_LEN];
        bytes.get_mut(..frame.len())?.copy_from_slice(frame);
        Some(Self { bytes, len: frame.len() })
    }

    /// The scout frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Deref for Scout {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for Scout {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq<[u8]> for Scout {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<Vec<u8>> for Scout {
    fn eq(&self, other: &Vec<u8>) -> bool {
        self.as_bytes() == other.as_slice()
    }
}

impl fmt::Debug for Scout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scout({})", hex::encode(self.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_frame_bytes() {
        let scout = Scout::new(&[2, 0, 254, 0, 0x80, 0x99]).unwrap();
        assert_eq!(scout.as_bytes(), [2, 0, 254, 0, 0x80, 0x99]);
        assert_eq!(scout.len(), 6);
    }

    #[test]
    fn longest_scout_fits() {
        assert!(Scout::new(&[1; MAX_SCOUT_LEN]).is_some());
        assert!(Scout::new(&[1; MAX_SCOUT_LEN + 1]).is_none());
    }

    #[test]
    fn equality_ignores_unused_storage() {
        let a = Scout::new(&[1, 2, 3]).unwrap();
        let b = Scout::new(&[1, 2, 3]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec![1, 2, 3]);
    }
}
