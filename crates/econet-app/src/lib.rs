//! Concurrency shell for the Econet engine
//!
//! The engine owns the link controller and polls it continuously, so it
//! runs on a dedicated thread. The host talks to it through two bounded
//! queues and shares nothing else with it except the receive buffer pool.
//!
//! ```text
//!  host task                         engine thread
//!  ─────────                         ─────────────
//!  send(Command) ──── depth 1 ────>  EngineLoop::poll_once
//!                                      ├─ execute command
//!                                      └─ claim buffer, receive/monitor
//!  next_event()  <── depth = pool ──  try_send(Event)
//!  take_buffer(handle)               (frame bytes stay in the pool)
//! ```
//!
//! # Components
//!
//! - [`command`]: Host commands and engine modes
//! - [`event`]: Events reported back to the host
//! - [`runtime`]: The engine loop
//! - [`bridge`]: Thread startup, the host handle and shutdown

pub mod bridge;
pub mod command;
pub mod event;
pub mod runtime;

pub use bridge::{BridgeConfig, BridgeHandle, EngineStopped, StartupError};
pub use command::{Command, Mode};
pub use event::{Counters, Event, RxEvent, StatusReport};
pub use runtime::EngineLoop;

/// Version reported in status events.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
