use likely_stable::unlikely;

use crate::bucket::{BucketLimiter, Flow};
use crate::private::Sealed;
use crate::{RateLimit, StdClock};

/// Token-bucket flow: tokens accrue continuously up to the capacity and each
/// admission takes one away.
#[derive(Debug, Clone, Copy)]
pub struct Refill;

impl Sealed for Refill {}

impl Flow for Refill {
    const NAME: &'static str = "token";

    fn initial_level(capacity: f64) -> f64 {
        capacity
    }

    fn replenish(level: f64, delta: f64, capacity: f64) -> f64 {
        (level + delta).min(capacity)
    }

    fn admit(level: f64, _capacity: f64) -> Option<f64> {
        if unlikely(level - 1.0 < 0.0) {
            None
        } else {
            Some(level - 1.0)
        }
    }

    fn retry_after(level: f64, limit: &RateLimit) -> f64 {
        (1.0 - level) / limit.rate
    }
}

/// A token-bucket limiter.
///
/// Starts full, so a burst of up to `capacity` requests is admitted right
/// away; afterwards throughput is bounded by the refill rate.
///
/// # Examples
///
/// ```rust
/// use admission::{Limiter, RateLimit, TokenBucketLimiter};
/// use std::num::NonZeroU32;
///
/// let limiter = TokenBucketLimiter::new(RateLimit::per_second_and_capacity(
///     NonZeroU32::new(10).unwrap(),
///     NonZeroU32::new(2).unwrap(),
/// ));
/// assert!(limiter.allow());
/// assert!(limiter.allow());
/// if let Err(limited) = limiter.check() {
///     println!("retry in {:?}", limited.earliest_retry_after());
/// }
/// ```
pub type TokenBucketLimiter<C = StdClock> = BucketLimiter<Refill, C>;
