//! Station numbers accepted on receive.

use econet_proto::BROADCAST_STATION;

/// The own station number followed by the broadcast marker.
///
/// Opening and data frames may match either entry. Acknowledgements are
/// only accepted for the own station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenAddresses([u8; 2]);

impl ListenAddresses {
    /// Listen set for `station`.
    pub const fn new(station: u8) -> Self {
        Self([station, BROADCAST_STATION])
    }

    /// Own station number.
    pub const fn station(&self) -> u8 {
        self.0[0]
    }

    /// Change the own station number.
    pub fn set_station(&mut self, station: u8) {
        self.0[0] = station;
    }

    /// Every accepted first byte.
    pub fn all(&self) -> &[u8] {
        &self.0
    }

    /// Only the own station number.
    pub fn own(&self) -> &[u8] {
        &self.0[..1]
    }
}
