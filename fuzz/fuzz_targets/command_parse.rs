//! Host command lines must parse or fail cleanly, and anything that parses
//! must survive a format round trip.

#![no_main]

use econet_bridge::commands::{format, parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(command) = parse(line) {
        let formatted = format(&command);
        if let Ok(again) = parse(&formatted) {
            assert_eq!(again, command);
        }
    }
});
