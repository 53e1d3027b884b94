//! Host protocol for the Econet bridge
//!
//! The bridge binary reads commands from stdin and writes events to stdout,
//! one per line. This crate holds the text side of that protocol; the engine
//! and its queues live in `econet-app`.
//!
//! # Components
//!
//! - [`commands`]: Command line parsing
//! - [`output`]: Event line rendering

#![forbid(unsafe_code)]

pub mod commands;
pub mod output;

pub use commands::{ParseError, parse};
pub use output::render;
