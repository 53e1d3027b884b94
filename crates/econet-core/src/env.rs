//! Environment hooks injected into the engine.
//!
//! The engine never reads the system time directly. Every deadline is
//! computed from a [`Clock`] so simulation can drive time deterministically,
//! the same way the rest of the engine is driven through [`crate::Adlc`].

use std::time::Instant;

/// Monotonic time source.
pub trait Clock: Send {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Line activity indicator (a data LED on hardware).
///
/// Called with `true` when a receive or transmit exchange starts and with
/// `false` when it ends.
pub trait ActivityIndicator: Send {
    /// Report whether the line is busy.
    fn set_active(&mut self, active: bool);
}

/// Indicator that ignores activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActivity;

impl ActivityIndicator for NoActivity {
    fn set_active(&mut self, _active: bool) {}
}

impl<F: FnMut(bool) + Send> ActivityIndicator for F {
    fn set_active(&mut self, active: bool) {
        self(active);
    }
}
