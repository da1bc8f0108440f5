use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Trait for monotonic clock implementations used by the limiters.
///
/// Implementations must provide monotonic time that never goes backwards.
/// The time is measured in seconds as floating-point values.
pub trait Clock {
    /// Returns the current time in seconds since an arbitrary epoch.
    ///
    /// The returned value must be monotonic (never decrease) and should
    /// have sufficient precision for rate limiting purposes.
    fn now(&self) -> f64;

    /// Suspends the calling thread for `duration`.
    ///
    /// Only the blocking fixed-window policy waits on the clock. Simulated
    /// clocks override this to move their own time forward instead.
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Seconds elapsed between two clock readings, never negative.
#[inline]
pub(crate) fn elapsed_since(earlier: f64, now: f64) -> f64 {
    (now - earlier).max(0.0)
}

/// Standard clock implementation using [`std::time::Instant`].
///
/// This provides high precision timing but may be slower than alternatives.
/// For high-performance scenarios, consider using `FastClock`.
///
/// # Examples
///
/// ```rust
/// use admission::{RateLimit, StdClock, TokenBucketLimiter};
/// use std::num::NonZeroU32;
///
/// let limit = RateLimit::per_second(NonZeroU32::new(100).unwrap());
/// let limiter = TokenBucketLimiter::<StdClock>::with_clock(limit, StdClock::default());
/// ```
#[derive(Clone)]
pub struct StdClock {
    origin: std::time::Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn now(&self) -> f64 {
        std::time::Instant::now()
            .duration_since(self.origin)
            .as_secs_f64()
    }
}

/// High-precision clock implementation using the `quanta` crate.
///
/// Requires the "quanta" feature to be enabled.
#[cfg(feature = "quanta")]
#[derive(Clone)]
pub struct QuantaClock {
    origin: quanta::Instant,
}

#[cfg(feature = "quanta")]
impl Default for QuantaClock {
    fn default() -> Self {
        Self::new(quanta::Clock::new())
    }
}

#[cfg(feature = "quanta")]
impl QuantaClock {
    /// Creates a new `QuantaClock` from a `quanta::Clock` instance.
    pub fn new(clock: quanta::Clock) -> Self {
        let origin = clock.now();
        Self { origin }
    }
}

#[cfg(feature = "quanta")]
impl Clock for QuantaClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Tokio-compatible clock implementation using [`tokio::time::Instant`].
///
/// Follows a paused tokio runtime, which makes it the clock of choice when
/// testing the async adapters. Requires the "tokio" feature.
#[cfg(feature = "tokio")]
#[derive(Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

#[cfg(feature = "tokio")]
impl Default for TokioClock {
    fn default() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

#[cfg(feature = "tokio")]
impl Clock for TokioClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// High-performance clock using quanta's coarse timing.
///
/// Precision is limited by how frequently quanta's upkeep thread runs.
/// Requires the "quanta" feature to be enabled.
///
/// # Examples
///
/// ```rust
/// # #[cfg(feature = "quanta")]
/// # {
/// use admission::{FastClock, LeakyBucketLimiter, RateLimit};
/// use std::num::NonZeroU32;
///
/// let limit = RateLimit::per_second(NonZeroU32::new(1000).unwrap());
/// let limiter = LeakyBucketLimiter::<FastClock>::with_clock(limit, FastClock::default());
/// # }
/// ```
#[cfg(feature = "quanta")]
#[derive(Clone)]
pub struct FastClock {
    clock: quanta::Clock,
    origin: quanta::Instant,
}

#[cfg(feature = "quanta")]
impl Default for FastClock {
    fn default() -> Self {
        Self::new(quanta::Clock::new())
    }
}

#[cfg(feature = "quanta")]
impl FastClock {
    /// Creates a new `FastClock` from a `quanta::Clock` instance.
    ///
    /// **Important**: Ensure the clock's upkeep thread is running, otherwise
    /// the limiter will not observe clock changes and timing will be incorrect.
    pub fn new(clock: quanta::Clock) -> Self {
        let origin = clock.recent();
        Self { clock, origin }
    }
}

#[cfg(feature = "quanta")]
impl Clock for FastClock {
    fn now(&self) -> f64 {
        (self.clock.recent() - self.origin).as_secs_f64()
    }
}

/// Manual clock implementation for testing and simulation.
///
/// Time only moves when told to. [`Clock::sleep`] advances the simulated
/// time by the requested duration and returns immediately, so a blocked
/// caller wakes exactly when its window rolls over.
///
/// # Examples
///
/// ```rust
/// use admission::{Limiter, ManualClock, RateLimit, TokenBucketLimiter};
/// use std::num::NonZeroU32;
/// use std::sync::Arc;
///
/// let limit = RateLimit::per_second(NonZeroU32::new(1).unwrap());
/// let clock = Arc::new(ManualClock::new(0.0));
/// let limiter = TokenBucketLimiter::<Arc<ManualClock>>::with_clock(limit, Arc::clone(&clock));
///
/// assert!(limiter.allow());
/// assert!(!limiter.allow());
///
/// // Advance time by 1 second
/// clock.advance(1.0);
/// assert!(limiter.allow());
/// ```
pub struct ManualClock {
    now: Mutex<f64>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ManualClock {
    /// Creates a new manual clock starting at `now` seconds.
    pub fn new(now: f64) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Sets the current time to the specified value in seconds.
    pub fn set(&self, now: f64) {
        *self.now.lock() = now;
    }

    /// Advances the current time by `delta` seconds.
    pub fn advance(&self, delta: f64) {
        *self.now.lock() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration.as_secs_f64());
    }
}
