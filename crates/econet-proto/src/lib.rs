//! Wire format for the Econet frame exchange.
//!
//! An Econet frame is a 4-byte address header (destination station,
//! destination network, source station, source network) followed by an
//! optional control/port pair and a payload. There is no length field: the
//! link controller delimits frames, so everything here works on byte slices
//! whose length is already known.
//!
//! A logical transfer is a four-way handshake. The sender opens with a scout
//! (header plus control and port), the receiver acknowledges with a bare
//! header, the sender follows with a data frame and the receiver acknowledges
//! again. Broadcasts are a single unacknowledged opening frame. Immediate
//! operations are scouts on port 0 that may be answered straight from the
//! acknowledgement.
//!
//! Nothing in this crate performs I/O. The engine in `econet-core` reads raw
//! frames off the controller and hands them to [`classify`], which decides
//! what each frame means given whether it opens an exchange.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod errors;
pub mod frame;
pub mod header;
pub mod immediate;

pub use classify::{FrameType, ParsedFrame, ScoutFields, classify};
pub use errors::FrameError;
pub use frame::{encode_data, encode_scout};
pub use header::{
    Address, BROADCAST_STATION, FrameHeader, HEADER_LEN, SCOUT_HEADER_LEN, is_broadcast_station,
};
pub use immediate::{MACHINE_PEEK, MachineIdentity};
