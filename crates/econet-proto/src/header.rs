//! Address header shared by every Econet frame.

/// Length of the address header present on every frame.
pub const HEADER_LEN: usize = 4;

/// Length of a scout: address header plus control byte and port.
pub const SCOUT_HEADER_LEN: usize = 6;

/// Station number used as the broadcast destination on transmit.
pub const BROADCAST_STATION: u8 = 0xFF;

/// Whether a destination station number addresses every station.
///
/// Both `0x00` and `0xFF` are treated as broadcast on receive.
pub const fn is_broadcast_station(station: u8) -> bool {
    station == 0x00 || station == BROADCAST_STATION
}

/// A station on a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    /// Station number (1-254 for real stations)
    pub station: u8,
    /// Network number (0 = local network)
    pub network: u8,
}

impl Address {
    /// Create an address from station and network numbers.
    pub const fn new(station: u8, network: u8) -> Self {
        Self { station, network }
    }
}

/// Destination and source addresses at the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    /// Addressee
    pub dest: Address,
    /// Sender
    pub src: Address,
}

impl FrameHeader {
    /// Create a header from its two addresses.
    pub const fn new(dest: Address, src: Address) -> Self {
        Self { dest, src }
    }

    /// Read the header from the first four bytes of a frame.
    ///
    /// Returns `None` if fewer than four bytes are available.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [dest_station, dest_net, src_station, src_net, ..] => Some(Self {
                dest: Address::new(*dest_station, *dest_net),
                src: Address::new(*src_station, *src_net),
            }),
            _ => None,
        }
    }

    /// Wire representation.
    pub const fn to_bytes(self) -> [u8; HEADER_LEN] {
        [self.dest.station, self.dest.network, self.src.station, self.src.network]
    }

    /// Header of the acknowledgement for a frame carrying this header.
    ///
    /// The acknowledgement travels back to the sender, so source and
    /// destination swap.
    pub const fn acknowledgement(self) -> Self {
        Self { dest: self.src, src: self.dest }
    }

    /// Whether the destination is a broadcast marker.
    pub const fn is_broadcast(&self) -> bool {
        is_broadcast_station(self.dest.station)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn header_field_order() {
        let header = FrameHeader::from_bytes(&hex!("02 00 fe 01")).unwrap();
        assert_eq!(header.dest, Address::new(0x02, 0x00));
        assert_eq!(header.src, Address::new(0xfe, 0x01));
        assert_eq!(header.to_bytes(), hex!("02 00 fe 01"));
    }

    #[test]
    fn short_input_has_no_header() {
        assert!(FrameHeader::from_bytes(&hex!("02 00 fe")).is_none());
        assert!(FrameHeader::from_bytes(&[]).is_none());
    }

    #[test]
    fn acknowledgement_swaps_addresses() {
        let header = FrameHeader::new(Address::new(2, 0), Address::new(254, 0));
        let ack = header.acknowledgement();
        assert_eq!(ack.to_bytes(), [254, 0, 2, 0]);
        assert_eq!(ack.acknowledgement(), header);
    }

    #[test]
    fn both_broadcast_markers_recognised() {
        assert!(is_broadcast_station(0x00));
        assert!(is_broadcast_station(0xff));
        assert!(!is_broadcast_station(0x01));
        assert!(!is_broadcast_station(0xfe));
    }
}
