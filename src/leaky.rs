use likely_stable::unlikely;

use crate::bucket::{BucketLimiter, Flow};
use crate::private::Sealed;
use crate::{RateLimit, StdClock};

/// Leaky-bucket flow: each admission pours one unit into the bucket, which
/// drains continuously at the configured rate. A unit that would overflow
/// the capacity is discarded.
#[derive(Debug, Clone, Copy)]
pub struct Leak;

impl Sealed for Leak {}

impl Flow for Leak {
    const NAME: &'static str = "leaky";

    fn initial_level(_capacity: f64) -> f64 {
        0.0
    }

    fn replenish(level: f64, delta: f64, _capacity: f64) -> f64 {
        (level - delta).max(0.0)
    }

    fn admit(level: f64, capacity: f64) -> Option<f64> {
        if unlikely(level + 1.0 > capacity) {
            None
        } else {
            Some(level + 1.0)
        }
    }

    fn retry_after(level: f64, limit: &RateLimit) -> f64 {
        (level + 1.0 - limit.capacity) / limit.rate
    }
}

/// A leaky-bucket limiter.
///
/// Starts empty. The capacity bounds the burst and the drain rate bounds the
/// sustained throughput.
///
/// # Examples
///
/// ```rust
/// use admission::{LeakyBucketLimiter, Limiter};
///
/// let limiter = LeakyBucketLimiter::configure(3.0, 3.0).unwrap();
/// assert!(limiter.allow());
/// assert!(limiter.allow());
/// assert!(limiter.allow());
/// assert!(!limiter.allow());
/// ```
pub type LeakyBucketLimiter<C = StdClock> = BucketLimiter<Leak, C>;
