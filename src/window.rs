use std::time::Duration;

use likely_stable::likely;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::clock::elapsed_since;
use crate::{Clock, ConfigurationError, Limiter, OverflowPolicy, RateLimited, StdClock, Window};

const MIN_NAP: Duration = Duration::from_nanos(1);

/// Counting state of the current cycle.
#[derive(Debug)]
struct Cycle {
    started_at: f64,
    admitted: u32,
}

/// A fixed-window counter.
///
/// Admits up to `rate` requests per cycle. The count is only reset when a
/// request finds the window exhausted and the cycle has elapsed, in a single
/// step: this is not a sliding window, and traffic can briefly reach twice
/// the rate around a boundary.
///
/// What happens to a request that finds the window exhausted is decided by
/// the [`OverflowPolicy`].
///
/// # Examples
///
/// ```rust
/// use admission::{FixedWindowLimiter, Limiter, OverflowPolicy};
/// use std::time::Duration;
///
/// let limiter =
///     FixedWindowLimiter::configure(2, Duration::from_secs(1), OverflowPolicy::Reject).unwrap();
/// assert!(limiter.allow());
/// assert!(limiter.allow());
/// assert!(!limiter.allow());
/// ```
pub struct FixedWindowLimiter<C = StdClock> {
    cycle: Mutex<Cycle>,
    clock: C,
    window: Window,
    cycle_secs: f64,
    policy: OverflowPolicy,
}

impl FixedWindowLimiter<StdClock> {
    /// Creates a limiter for `window` using the standard clock.
    pub fn new(window: Window, policy: OverflowPolicy) -> Self {
        Self::with_clock(window, policy, StdClock::default())
    }

    /// Validates `rate` and `cycle` and creates a limiter using the
    /// standard clock.
    pub fn configure(
        rate: u32,
        cycle: Duration,
        policy: OverflowPolicy,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self::new(Window::new(rate, cycle)?, policy))
    }
}

impl<C: Clock> FixedWindowLimiter<C> {
    /// Creates a limiter with a custom clock. The first cycle starts now.
    pub fn with_clock(window: Window, policy: OverflowPolicy, clock: C) -> Self {
        debug!(
            rate = window.rate(),
            cycle = ?window.cycle(),
            ?policy,
            "configured fixed window limiter"
        );
        Self {
            cycle: Mutex::new(Cycle {
                started_at: clock.now(),
                admitted: 0,
            }),
            clock,
            window,
            cycle_secs: window.cycle().as_secs_f64(),
            policy,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Number of requests admitted since the current cycle started.
    pub fn admitted(&self) -> u32 {
        self.cycle.lock().admitted
    }
}

impl<C: Clock> Limiter for FixedWindowLimiter<C> {
    fn check(&self) -> Result<(), RateLimited> {
        let mut cycle = self.cycle.lock();
        loop {
            if likely(cycle.admitted < self.window.rate()) {
                cycle.admitted += 1;
                return Ok(());
            }

            let now = self.clock.now();
            let elapsed = elapsed_since(cycle.started_at, now);
            if elapsed >= self.cycle_secs {
                debug!(
                    admitted = cycle.admitted,
                    elapsed, "fixed window rolled over"
                );
                cycle.started_at = now;
                cycle.admitted = 0;
                continue;
            }

            let remaining = self.cycle_secs - elapsed;
            match self.policy {
                OverflowPolicy::Reject => {
                    trace!(remaining, "fixed window exhausted, rejecting");
                    return Err(RateLimited::after_secs(remaining));
                }
                OverflowPolicy::Block => {
                    trace!(remaining, "fixed window exhausted, waiting for next cycle");
                    // other callers must be able to observe and roll the
                    // window while this one sleeps
                    let nap = Duration::from_secs_f64(remaining).max(MIN_NAP);
                    MutexGuard::unlocked(&mut cycle, || self.clock.sleep(nap));
                }
            }
        }
    }
}
