//! Econet frame-exchange engine
//!
//! Drives a 6854-style ADLC link controller through its registers to send
//! and receive Econet frames, and runs the four-way handshake (scout, ack,
//! data, ack) on both sides of a transfer.
//!
//! # Architecture
//!
//! The engine owns the controller exclusively and is single-threaded: one
//! execution context polls the controller, classifies frames and answers
//! them. Every wait is a polling loop against a deadline taken from an
//! injected [`env::Clock`]; nothing blocks on an interrupt. Register access
//! goes through the [`adlc::Adlc`] trait so the same engine runs against
//! real hardware and against the simulated controller in `econet-harness`.
//!
//! Received payloads are written straight into buffers claimed from a
//! [`pool::BufferPool`], which is the only structure meant to be shared with
//! another thread. Handing the buffer's handle across instead of its bytes
//! keeps the receive path copy-free.
//!
//! Every path out of a frame read or write leaves the controller listening
//! with receive interrupts enabled and status cleared, whatever the outcome.
//!
//! # Components
//!
//! - [`adlc`]: Register interface and controller bit tables
//! - [`env`]: Clock and activity indicator abstractions
//! - [`poll`]: Deadline-bounded status polling
//! - [`line`]: Frame I/O (`read_frame`, `tx_frame`) and controller commands
//! - [`engine`]: Handshake orchestration for receive, monitor and transmit
//! - [`reply`]: Pending reply bookkeeping
//! - [`scout`]: Inline storage for received scouts
//! - [`listen`]: Station numbers accepted on receive
//! - [`pool`]: Fixed-size receive buffer pool
//! - [`config`]: Engine configuration and timeouts
//! - [`error`]: Error taxonomy

pub mod adlc;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod line;
pub mod listen;
pub mod poll;
pub mod pool;
pub mod reply;
pub mod scout;

pub use adlc::{Adlc, ReadRegister, WriteRegister};
pub use config::{BufferSizes, EngineConfig, Timeouts};
pub use engine::{Engine, RxResult, TransmitRequest};
pub use env::{ActivityIndicator, Clock, SystemClock};
pub use error::{AckError, ConfigError, PoolError, RxError, TxError};
pub use line::{Line, ReadOutcome, WriteOutcome};
pub use pool::{BufferHandle, BufferPool, Claim};
pub use scout::{MAX_SCOUT_LEN, Scout};
