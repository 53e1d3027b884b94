//! Deterministic simulation harness for the Econet engine.
//!
//! A register-accurate stand-in for the link controller and a virtual clock
//! that advances with every register access, so timeout behaviour is exact
//! and repeatable without real hardware or wall-clock waits.
//!
//! - [`SimAdlc`]: simulated controller with scripted inbound frames, fault
//!   injection and loopback
//! - [`SimClock`]: virtual monotonic clock
//! - [`peer`]: frame builders and scripted remote stations
//! - [`noise`]: seeded random line faults

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod noise;
pub mod peer;
pub mod sim_adlc;
pub mod sim_clock;

pub use noise::LineNoise;
pub use sim_adlc::{InboundFrame, Responder, RxFault, SimAdlc, TxFault};
pub use sim_clock::SimClock;
