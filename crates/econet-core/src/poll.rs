//! Deadline-bounded polling.
//!
//! Every wait in the engine (for FIFO space, for the next received byte, for
//! the start of a frame, for an acknowledgement) goes through
//! [`poll_until`]. A deadline is fixed when the wait starts and checked
//! before each probe, so a condition that never arrives always ends in a
//! timeout and a condition that is already true is seen without delay as
//! long as the deadline has not passed.

use std::time::{Duration, Instant};

use crate::env::Clock;

/// A point in time after which a wait gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after<C: Clock + ?Sized>(clock: &C, timeout: Duration) -> Self {
        Self(clock.now() + timeout)
    }

    /// Whether the deadline has passed.
    pub fn has_passed<C: Clock + ?Sized>(self, clock: &C) -> bool {
        clock.now() > self.0
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining<C: Clock + ?Sized>(self, clock: &C) -> Duration {
        self.0.saturating_duration_since(clock.now())
    }

    /// The deadline instant.
    pub fn instant(self) -> Instant {
        self.0
    }
}

/// Repeatedly run `probe` until it yields a value or the deadline passes.
///
/// Returns `None` on timeout. The deadline is checked before every probe.
pub fn poll_until<C, T, F>(clock: &C, deadline: Deadline, mut probe: F) -> Option<T>
where
    C: Clock + ?Sized,
    F: FnMut() -> Option<T>,
{
    loop {
        if deadline.has_passed(clock) {
            return None;
        }
        if let Some(value) = probe() {
            return Some(value);
        }
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    /// Clock that advances one millisecond every time it is read.
    struct SteppingClock {
        base: Instant,
        ticks: AtomicU64,
    }

    impl SteppingClock {
        fn new() -> Self {
            Self { base: Instant::now(), ticks: AtomicU64::new(0) }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> Instant {
            let ticks = self.ticks.fetch_add(1, Ordering::Relaxed);
            self.base + Duration::from_millis(ticks)
        }
    }

    #[test]
    fn ready_condition_returns_immediately() {
        let clock = SteppingClock::new();
        let deadline = Deadline::after(&clock, Duration::from_millis(10));
        let mut probes = 0;
        let result = poll_until(&clock, deadline, || {
            probes += 1;
            Some(7)
        });
        assert_eq!(result, Some(7));
        assert_eq!(probes, 1);
    }

    #[test]
    fn never_ready_times_out() {
        let clock = SteppingClock::new();
        let deadline = Deadline::after(&clock, Duration::from_millis(10));
        let mut probes = 0;
        let result: Option<()> = poll_until(&clock, deadline, || {
            probes += 1;
            None
        });
        assert_eq!(result, None);
        // One clock read per iteration, ten milliseconds of budget.
        assert!((9..=11).contains(&probes), "probes = {probes}");
        assert!(deadline.has_passed(&clock));
    }

    #[test]
    fn condition_arriving_late_is_seen() {
        let clock = SteppingClock::new();
        let deadline = Deadline::after(&clock, Duration::from_millis(100));
        let mut probes = 0;
        let result = poll_until(&clock, deadline, || {
            probes += 1;
            (probes == 5).then_some("ready")
        });
        assert_eq!(result, Some("ready"));
    }

    #[test]
    fn remaining_saturates_at_zero() {
        let clock = SteppingClock::new();
        let deadline = Deadline::after(&clock, Duration::from_millis(2));
        assert!(deadline.remaining(&clock) <= Duration::from_millis(2));
        for _ in 0..5 {
            clock.now();
        }
        assert_eq!(deadline.remaining(&clock), Duration::ZERO);
    }
}
