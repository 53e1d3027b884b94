//! Frame classification.
//!
//! Frames carry no type field. What a frame means depends on its length, its
//! destination and on whether the receiver is expecting the opening frame of
//! an exchange or a follow-up:
//!
//! | opening | length | condition              | type          |
//! |---------|--------|------------------------|---------------|
//! | any     | < 4    |                        | `Unknown`     |
//! | no      | 4      |                        | `Acknowledge` |
//! | no      | > 4    |                        | `Data`        |
//! | yes     | < 6    |                        | `Unknown`     |
//! | yes     | >= 6   | dest station 0 or 255  | `Broadcast`   |
//! | yes     | 6      |                        | `Transmit`    |
//! | yes     | > 6    | port 0                 | `Immediate`   |
//! | yes     | > 6    | any other port         | `Unknown`     |

use crate::header::{FrameHeader, HEADER_LEN, SCOUT_HEADER_LEN};

/// Semantic category of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Follow-up frame consisting of the address header only
    Acknowledge,
    /// Follow-up frame carrying a payload
    Data,
    /// Opening frame addressed to every station
    Broadcast,
    /// Opening scout announcing a data frame
    Transmit,
    /// Opening scout on port 0 requesting an immediate operation
    Immediate,
    /// Anything else; always handled as a protocol error
    Unknown,
}

/// Control byte and port carried by opening frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScoutFields {
    /// Control byte (operation code for immediate operations)
    pub control: u8,
    /// Destination port (0 = immediate operation)
    pub port: u8,
}

/// A classified view over a raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFrame<'a> {
    /// What the frame means
    pub frame_type: FrameType,
    /// Address header, present for frames of at least four bytes
    pub header: Option<FrameHeader>,
    /// Control/port pair, present for opening frames of at least six bytes
    pub scout: Option<ScoutFields>,
    /// Bytes after the header (and after control/port on opening frames)
    pub payload: &'a [u8],
    /// The whole frame
    pub bytes: &'a [u8],
}

impl ParsedFrame<'_> {
    /// Whether the frame is of the given type.
    pub fn is(&self, frame_type: FrameType) -> bool {
        self.frame_type == frame_type
    }
}

/// Classify a raw frame.
///
/// `opening` is true when the frame starts a new exchange (the first frame
/// after the controller signalled an address) and false for frames expected
/// inside a handshake.
pub fn classify(bytes: &[u8], opening: bool) -> ParsedFrame<'_> {
    let Some(header) = FrameHeader::from_bytes(bytes) else {
        return ParsedFrame {
            frame_type: FrameType::Unknown,
            header: None,
            scout: None,
            payload: &[],
            bytes,
        };
    };

    let len = bytes.len();

    if !opening {
        let frame_type = if len == HEADER_LEN { FrameType::Acknowledge } else { FrameType::Data };
        return ParsedFrame {
            frame_type,
            header: Some(header),
            scout: None,
            payload: &bytes[HEADER_LEN..],
            bytes,
        };
    }

    if len < SCOUT_HEADER_LEN {
        return ParsedFrame {
            frame_type: FrameType::Unknown,
            header: Some(header),
            scout: None,
            payload: &bytes[HEADER_LEN..],
            bytes,
        };
    }

    let scout = ScoutFields { control: bytes[4], port: bytes[5] };

    let frame_type = if header.is_broadcast() {
        FrameType::Broadcast
    } else if len == SCOUT_HEADER_LEN {
        FrameType::Transmit
    } else if scout.port == 0 {
        FrameType::Immediate
    } else {
        FrameType::Unknown
    };

    ParsedFrame {
        frame_type,
        header: Some(header),
        scout: Some(scout),
        payload: &bytes[SCOUT_HEADER_LEN..],
        bytes,
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;
    use crate::header::Address;

    const FRAME: [u8; 7] = hex!("02 00 fe 00 88 00 01");

    #[test]
    fn follow_up_boundary_lengths() {
        let expected = [
            (0, FrameType::Unknown),
            (3, FrameType::Unknown),
            (4, FrameType::Acknowledge),
            (5, FrameType::Data),
            (6, FrameType::Data),
            (7, FrameType::Data),
        ];
        for (len, frame_type) in expected {
            assert_eq!(classify(&FRAME[..len], false).frame_type, frame_type, "length {len}");
        }
    }

    #[test]
    fn opening_boundary_lengths() {
        let expected = [
            (0, FrameType::Unknown),
            (3, FrameType::Unknown),
            (4, FrameType::Unknown),
            (5, FrameType::Unknown),
            (6, FrameType::Transmit),
            (7, FrameType::Immediate),
        ];
        for (len, frame_type) in expected {
            assert_eq!(classify(&FRAME[..len], true).frame_type, frame_type, "length {len}");
        }
    }

    #[test]
    fn scout_fields_parsed() {
        let parsed = classify(&hex!("02 00 fe 00 80 99"), true);
        assert_eq!(parsed.frame_type, FrameType::Transmit);
        assert_eq!(parsed.scout, Some(ScoutFields { control: 0x80, port: 0x99 }));
        assert_eq!(
            parsed.header,
            Some(FrameHeader::new(Address::new(0x02, 0x00), Address::new(0xfe, 0x00)))
        );
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn long_scout_on_data_port_is_unknown() {
        let parsed = classify(&hex!("02 00 fe 00 80 99 01 02"), true);
        assert_eq!(parsed.frame_type, FrameType::Unknown);
        assert_eq!(parsed.payload, &hex!("01 02"));
    }

    #[test]
    fn data_payload_follows_header() {
        let parsed = classify(&hex!("02 00 fe 00 aa bb"), false);
        assert_eq!(parsed.frame_type, FrameType::Data);
        assert_eq!(parsed.payload, &hex!("aa bb"));
        assert!(parsed.scout.is_none());
    }

    #[test]
    fn broadcast_of_nine_bytes() {
        let parsed = classify(&hex!("ff ff 05 00 80 99 41 42 43"), true);
        assert!(parsed.is(FrameType::Broadcast));
        assert_eq!(parsed.payload, b"ABC");
    }

    proptest! {
        #[test]
        fn follow_up_type_depends_only_on_length(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let expected = match bytes.len() {
                0..=3 => FrameType::Unknown,
                4 => FrameType::Acknowledge,
                _ => FrameType::Data,
            };
            prop_assert_eq!(classify(&bytes, false).frame_type, expected);
        }

        #[test]
        fn broadcast_destination_always_broadcast(
            dest in prop_oneof![Just(0x00u8), Just(0xffu8)],
            rest in proptest::collection::vec(any::<u8>(), 5..64),
        ) {
            let mut bytes = vec![dest];
            bytes.extend_from_slice(&rest);
            prop_assert_eq!(classify(&bytes, true).frame_type, FrameType::Broadcast);
        }

        #[test]
        fn classification_never_reads_past_frame(bytes in proptest::collection::vec(any::<u8>(), 0..16), opening in any::<bool>()) {
            let parsed = classify(&bytes, opening);
            prop_assert_eq!(parsed.bytes.len(), bytes.len());
            prop_assert!(parsed.payload.len() <= bytes.len());
        }
    }
}
