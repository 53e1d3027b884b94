//! Classify arbitrary frames in both positions and check the parts agree
//! with the input.

#![no_main]

use econet_proto::{FrameType, HEADER_LEN, SCOUT_HEADER_LEN, classify};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for opening in [true, false] {
        let frame = classify(data, opening);
        assert_eq!(frame.bytes, data);

        if data.len() < HEADER_LEN {
            assert_eq!(frame.frame_type, FrameType::Unknown);
            assert!(frame.header.is_none());
            continue;
        }

        let header = frame.header.expect("header for frames of at least four bytes");
        assert_eq!(header.to_bytes().as_slice(), &data[..HEADER_LEN]);

        if let Some(scout) = frame.scout {
            assert!(data.len() >= SCOUT_HEADER_LEN);
            assert_eq!([scout.control, scout.port], [data[4], data[5]]);
        }
        assert!(frame.payload.len() <= data.len() - HEADER_LEN);
    }
});
