//! Fixed-window rate limiter for re-renders
//!
//! Admission of the leading run is a `governor` quota of one cell per window,
//! driven by a clock that follows the `now_ms` the host hands in. The first
//! request that lands inside a running window arms a single trailing run at
//! the end of the window; anything after that in the same window is dropped.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, FakeRelativeClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::middleware::NoOpMiddleware;
use governor::{Quota, RateLimiter};

/// Default window between two renders
pub const THROTTLE_WINDOW_MS: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    /// Run now
    Run,
    /// A trailing run is armed for `due_at`; the caller should poll then
    Deferred { due_at: f64 },
    /// A trailing run is already armed
    Dropped,
}

/// What a timer wake-up should do
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PollOutcome {
    /// The trailing run is due; it has been disarmed
    Due,
    /// Woken before `due_at`; poll again then
    Early { due_at: f64 },
    /// Nothing armed
    Idle,
}

/// Host time in milliseconds, mirrored into a governor clock
struct HostClock {
    clock: FakeRelativeClock,
    nanos: u64,
}

impl HostClock {
    fn new() -> Self {
        Self {
            clock: FakeRelativeClock::default(),
            nanos: 0,
        }
    }

    // host time never runs backwards for the limiter
    fn advance_to(&mut self, now_ms: f64) {
        let target = if now_ms.is_finite() && now_ms > 0.0 {
            (now_ms * 1_000_000.0).round() as u64
        } else {
            0
        };
        if target > self.nanos {
            self.clock.advance(Duration::from_nanos(target - self.nanos));
            self.nanos = target;
        }
    }

    fn now_ms(&self) -> f64 {
        self.nanos as f64 / 1_000_000.0
    }
}

pub struct Throttle {
    window_ms: f64,
    clock: HostClock,
    limiter: RateLimiter<NotKeyed, InMemoryState, FakeRelativeClock, NoOpMiddleware<<FakeRelativeClock as Clock>::Instant>>,
    pending: Option<f64>,
}

impl Throttle {
    pub fn new(window_ms: f64) -> Self {
        let clock = HostClock::new();
        let period = Duration::from_secs_f64((window_ms.max(0.0) / 1000.0).max(1e-9));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);
        let limiter = RateLimiter::direct_with_clock(quota, &clock.clock);
        Self {
            window_ms,
            clock,
            limiter,
            pending: None,
        }
    }

    pub fn window_ms(&self) -> f64 {
        self.window_ms
    }

    pub fn request(&mut self, now: f64) -> Decision {
        self.clock.advance_to(now);
        match self.pending {
            Some(due_at) if now < due_at => return Decision::Dropped,
            // the timer for this run never fired in time; fold it into this one
            Some(_) => self.pending = None,
            None => {}
        }
        match self.limiter.check() {
            Ok(_) => Decision::Run,
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.clock.now());
                let due_at = self.clock.now_ms() + wait.as_nanos() as f64 / 1_000_000.0;
                self.pending = Some(due_at);
                Decision::Deferred { due_at }
            }
        }
    }

    /// Check an armed trailing run against `now`; disarms it when due
    pub fn poll(&mut self, now: f64) -> PollOutcome {
        self.clock.advance_to(now);
        match self.pending {
            Some(due_at) if now >= due_at => {
                self.pending = None;
                // the trailing run opens the next window
                let _ = self.limiter.check();
                PollOutcome::Due
            }
            Some(due_at) => PollOutcome::Early { due_at },
            None => PollOutcome::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any armed trailing run
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(THROTTLE_WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_call_runs() {
        let mut throttle = Throttle::default();
        assert_eq!(throttle.request(0.0), Decision::Run);
        assert_eq!(throttle.request(150.0), Decision::Run);
    }

    #[test]
    fn test_one_trailing_call_per_window() {
        let mut throttle = Throttle::default();
        assert_eq!(throttle.request(0.0), Decision::Run);
        assert_eq!(throttle.request(10.0), Decision::Deferred { due_at: 100.0 });
        assert_eq!(throttle.request(20.0), Decision::Dropped);
        assert_eq!(throttle.request(90.0), Decision::Dropped);

        assert_eq!(throttle.poll(50.0), PollOutcome::Early { due_at: 100.0 });
        assert_eq!(throttle.poll(100.0), PollOutcome::Due);
        assert_eq!(throttle.poll(101.0), PollOutcome::Idle);
    }

    #[test]
    fn test_trailing_run_starts_a_new_window() {
        let mut throttle = Throttle::default();
        throttle.request(0.0);
        throttle.request(10.0);
        assert_eq!(throttle.poll(100.0), PollOutcome::Due);
        assert_eq!(throttle.request(150.0), Decision::Deferred { due_at: 200.0 });
    }

    #[test]
    fn test_early_poll_keeps_run_armed() {
        let mut throttle = Throttle::default();
        throttle.request(0.0);
        throttle.request(10.0);

        assert_eq!(throttle.poll(99.0), PollOutcome::Early { due_at: 100.0 });
        assert!(throttle.is_pending());
        assert_eq!(throttle.poll(100.0), PollOutcome::Due);
        assert!(!throttle.is_pending());
    }

    #[test]
    fn test_stale_pending_run_does_not_block_later_windows() {
        let mut throttle = Throttle::default();
        throttle.request(0.0);
        throttle.request(10.0);
        // the wake-up came early and was never repeated
        assert_eq!(throttle.poll(99.0), PollOutcome::Early { due_at: 100.0 });

        assert_eq!(throttle.request(60_000.0), Decision::Run);
        assert!(!throttle.is_pending());
        assert_eq!(
            throttle.request(60_010.0),
            Decision::Deferred { due_at: 60_100.0 }
        );
    }

    #[test]
    fn test_cancel_drops_pending_run() {
        let mut throttle = Throttle::default();
        throttle.request(0.0);
        throttle.request(10.0);
        assert!(throttle.is_pending());
        throttle.cancel();
        assert!(!throttle.is_pending());
        assert_eq!(throttle.poll(500.0), PollOutcome::Idle);
    }
}
