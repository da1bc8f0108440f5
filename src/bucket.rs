use std::marker::PhantomData;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::clock::elapsed_since;
use crate::private::Sealed;
use crate::{Clock, ConfigurationError, Limiter, RateLimit, RateLimited, StdClock};

/// How a bucket replenishes and what an admission does to its level.
///
/// Sealed: the two flows are [`Leak`](crate::Leak), which drains a level
/// that admissions fill up, and [`Refill`](crate::Refill), which refills
/// tokens that admissions take away.
pub trait Flow: Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    const NAME: &'static str;

    /// Level of a freshly configured bucket.
    #[doc(hidden)]
    fn initial_level(capacity: f64) -> f64;

    /// Level after `delta` units have drained or accrued.
    #[doc(hidden)]
    fn replenish(level: f64, delta: f64, capacity: f64) -> f64;

    /// Level after admitting one unit, `None` if the unit does not fit.
    #[doc(hidden)]
    fn admit(level: f64, capacity: f64) -> Option<f64>;

    /// Seconds until one more unit would fit.
    #[doc(hidden)]
    fn retry_after(level: f64, limit: &RateLimit) -> f64;
}

/// Bucket level and the instant it was last recomputed.
#[derive(Debug)]
pub(crate) struct Level {
    level: f64,
    updated_at: f64,
}

impl Level {
    fn project<F: Flow>(&self, limit: &RateLimit, now: f64) -> f64 {
        let delta = elapsed_since(self.updated_at, now) * limit.rate;
        F::replenish(self.level, delta, limit.capacity).clamp(0.0, limit.capacity)
    }

    fn replenish<F: Flow>(&mut self, limit: &RateLimit, now: f64) {
        self.level = self.project::<F>(limit, now);
        self.updated_at = self.updated_at.max(now);
    }

    fn try_admit<F: Flow>(&mut self, limit: &RateLimit) -> Result<(), RateLimited> {
        match F::admit(self.level, limit.capacity) {
            Some(level) => {
                self.level = level.clamp(0.0, limit.capacity);
                Ok(())
            }
            None => {
                trace!(flow = F::NAME, level = self.level, "bucket rejected request");
                Err(RateLimited::after_secs(F::retry_after(self.level, limit)))
            }
        }
    }
}

/// A lazily replenished bucket limiter.
///
/// Every admission decision first brings the level up to date with the time
/// elapsed since the previous one, so there is no background activity to
/// manage. The whole read-modify-write sequence runs under one lock.
///
/// Use it through the [`LeakyBucketLimiter`](crate::LeakyBucketLimiter) and
/// [`TokenBucketLimiter`](crate::TokenBucketLimiter) aliases.
pub struct BucketLimiter<F, C = StdClock> {
    level: Mutex<Level>,
    clock: C,
    limit: RateLimit,
    _flow: PhantomData<fn() -> F>,
}

impl<F: Flow> BucketLimiter<F, StdClock> {
    /// Creates a bucket for `limit` using the standard clock.
    pub fn new(limit: RateLimit) -> Self {
        Self::with_clock(limit, StdClock::default())
    }

    /// Validates `rate_per_second` and `capacity` and creates a bucket using
    /// the standard clock.
    pub fn configure(rate_per_second: f64, capacity: f64) -> Result<Self, ConfigurationError> {
        Ok(Self::new(RateLimit::new(rate_per_second, capacity)?))
    }
}

impl<F: Flow, C: Clock> BucketLimiter<F, C> {
    /// Creates a bucket with a custom clock.
    pub fn with_clock(limit: RateLimit, clock: C) -> Self {
        debug!(
            flow = F::NAME,
            rate = limit.rate_per_second(),
            capacity = limit.capacity(),
            "configured bucket limiter"
        );
        Self {
            level: Mutex::new(Level {
                level: F::initial_level(limit.capacity),
                updated_at: clock.now(),
            }),
            clock,
            limit,
            _flow: PhantomData,
        }
    }

    pub fn limit(&self) -> &RateLimit {
        &self.limit
    }

    /// Current level, brought up to date with the clock.
    ///
    /// This is a read-only projection; the stored state is not modified.
    pub fn level(&self) -> f64 {
        let level = self.level.lock();
        level.project::<F>(&self.limit, self.clock.now())
    }

    /// Level as of the last recomputation.
    pub(crate) fn stored_level(&self) -> f64 {
        self.level.lock().level
    }

    pub(crate) fn replenish(&self) {
        let mut level = self.level.lock();
        level.replenish::<F>(&self.limit, self.clock.now());
    }

    /// Admission against the stored level, without looking at the clock.
    pub(crate) fn admit_current(&self) -> Result<(), RateLimited> {
        self.level.lock().try_admit::<F>(&self.limit)
    }
}

impl<F: Flow, C: Clock> Limiter for BucketLimiter<F, C> {
    fn check(&self) -> Result<(), RateLimited> {
        let mut level = self.level.lock();
        level.replenish::<F>(&self.limit, self.clock.now());
        level.try_admit::<F>(&self.limit)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nonzero_ext::nonzero;

    use super::*;
    use crate::{Leak, ManualClock, Refill};

    fn check_bounds<F: Flow>(limit: RateLimit) {
        let clock = Arc::new(ManualClock::default());
        let bucket = BucketLimiter::<F, _>::with_clock(limit, Arc::clone(&clock));
        let steps = [0.0, 0.01, 0.3, 0.0, 2.0, 0.05, 10.0, 0.0, 0.2, 0.7];
        for (i, step) in steps.iter().cycle().take(200).enumerate() {
            clock.advance(*step);
            for _ in 0..(i % 4) {
                bucket.allow();
                let level = bucket.stored_level();
                assert!((0.0..=limit.capacity()).contains(&level), "{level}");
            }
            let level = bucket.level();
            assert!((0.0..=limit.capacity()).contains(&level), "{level}");
        }
    }

    #[test]
    fn level_stays_within_capacity() {
        check_bounds::<Leak>(RateLimit::per_second_and_capacity(nonzero!(3u32), nonzero!(5u32)));
        check_bounds::<Refill>(RateLimit::per_second_and_capacity(nonzero!(3u32), nonzero!(5u32)));
        check_bounds::<Leak>(RateLimit::new(0.5, 1.5).unwrap());
        check_bounds::<Refill>(RateLimit::new(0.5, 1.5).unwrap());
    }

    #[test]
    fn clock_going_backwards_is_ignored() {
        let clock = Arc::new(ManualClock::new(10.0));
        let limit = RateLimit::per_second(nonzero!(1u32));
        let bucket = BucketLimiter::<Refill, _>::with_clock(limit, Arc::clone(&clock));
        assert!(bucket.allow());
        clock.set(5.0);
        assert!(!bucket.allow());
        assert_eq!(0.0, bucket.level());
        // time before the last update does not count twice
        clock.set(10.5);
        assert_eq!(0.5, bucket.level());
    }

    #[test]
    fn level_is_read_only() {
        let clock = Arc::new(ManualClock::default());
        let limit = RateLimit::per_second_and_capacity(nonzero!(2u32), nonzero!(4u32));
        let bucket = BucketLimiter::<Leak, _>::with_clock(limit, Arc::clone(&clock));
        for _ in 0..4 {
            assert!(bucket.allow());
        }
        clock.advance(1.0);
        assert_eq!(2.0, bucket.level());
        assert_eq!(4.0, bucket.stored_level());
    }
}
