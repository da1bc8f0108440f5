//! Background-replenished buckets.
//!
//! Instead of recomputing the level on every admission, a dedicated thread
//! recomputes it once per tick and [`Limiter::check`] only looks at the
//! stored value. Between two ticks the level can lag behind the clock by up
//! to one tick, which is the price of keeping the clock off the admission
//! path. Prefer the lazy [`BucketLimiter`] unless that trade is wanted.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::bucket::{BucketLimiter, Flow};
use crate::{Clock, ConfigurationError, Leak, Limiter, RateLimit, RateLimited, Refill, StdClock};

const MIN_TICK: Duration = Duration::from_millis(1);

/// Replenishment period for `rate` units per second: one unit per tick.
fn tick_for(rate: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / rate)
        .unwrap_or(Duration::MAX)
        .max(MIN_TICK)
}

/// Owns the replenishing thread. Dropping the stop sender wakes it up.
struct Replenisher {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Replenisher {
    fn spawn<F, C>(bucket: Arc<BucketLimiter<F, C>>, tick: Duration) -> Self
    where
        F: Flow,
        C: Clock + Send + Sync + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            debug!(flow = F::NAME, ?tick, "replenisher started");
            loop {
                match stopped.recv_timeout(tick) {
                    Err(RecvTimeoutError::Timeout) => bucket.replenish(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!(flow = F::NAME, "replenisher stopped");
        });
        Self { stop, handle }
    }

    fn stop(self) {
        drop(self.stop);
        if self.handle.join().is_err() {
            warn!("replenisher thread panicked");
        }
    }
}

/// A bucket whose level is recomputed by a background thread every
/// `1 / rate` seconds (at least every millisecond).
///
/// The thread is started by [`spawn`](Self::spawn) once the configuration is
/// known to be valid, and is stopped and joined by [`shutdown`](Self::shutdown)
/// or when the bucket is dropped.
///
/// # Examples
///
/// ```rust
/// use admission::{EagerTokenBucket, Limiter};
///
/// let mut bucket = EagerTokenBucket::configure(100.0, 5.0).unwrap();
/// assert!(bucket.allow());
/// bucket.shutdown();
/// ```
pub struct EagerBucket<F: Flow, C: Clock + Send + Sync + 'static = StdClock> {
    bucket: Arc<BucketLimiter<F, C>>,
    replenisher: Option<Replenisher>,
}

/// Leaky bucket drained by a background thread.
pub type EagerLeakyBucket<C = StdClock> = EagerBucket<Leak, C>;

/// Token bucket refilled by a background thread.
pub type EagerTokenBucket<C = StdClock> = EagerBucket<Refill, C>;

impl<F: Flow> EagerBucket<F, StdClock> {
    /// Validates the settings, then starts the replenisher with the standard
    /// clock. Nothing is spawned if validation fails.
    pub fn configure(rate_per_second: f64, capacity: f64) -> Result<Self, ConfigurationError> {
        let limit = RateLimit::new(rate_per_second, capacity)?;
        Ok(Self::spawn(limit, StdClock::default()))
    }
}

impl<F: Flow, C: Clock + Send + Sync + 'static> EagerBucket<F, C> {
    /// Creates the bucket and starts its replenisher thread.
    pub fn spawn(limit: RateLimit, clock: C) -> Self {
        let bucket = Arc::new(BucketLimiter::with_clock(limit, clock));
        let replenisher = Replenisher::spawn(Arc::clone(&bucket), tick_for(limit.rate));
        Self {
            bucket,
            replenisher: Some(replenisher),
        }
    }

    pub fn limit(&self) -> &RateLimit {
        self.bucket.limit()
    }

    /// Level as of the last tick.
    pub fn level(&self) -> f64 {
        self.bucket.stored_level()
    }

    /// Whether the replenisher thread is still running.
    pub fn is_running(&self) -> bool {
        self.replenisher.is_some()
    }

    /// Stops the replenisher and waits for its thread to exit. The level is
    /// frozen afterwards. Calling it again does nothing.
    pub fn shutdown(&mut self) {
        if let Some(replenisher) = self.replenisher.take() {
            replenisher.stop();
        }
    }
}

impl<F: Flow, C: Clock + Send + Sync + 'static> Limiter for EagerBucket<F, C> {
    fn check(&self) -> Result<(), RateLimited> {
        self.bucket.admit_current()
    }
}

impl<F: Flow, C: Clock + Send + Sync + 'static> Drop for EagerBucket<F, C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use nonzero_ext::nonzero;

    use super::*;
    use crate::ManualClock;

    #[test]
    fn tick_is_one_unit_of_rate() {
        assert_eq!(Duration::from_millis(250), tick_for(4.0));
        assert_eq!(MIN_TICK, tick_for(1_000_000.0));
        assert_eq!(Duration::MAX, tick_for(f64::MIN_POSITIVE));
    }

    #[test]
    fn admission_uses_stored_level() {
        let clock = Arc::new(ManualClock::default());
        // one tick every 100s, never reached during the test
        let limit = RateLimit::new(0.01, 2.0).unwrap();
        let bucket = EagerTokenBucket::<Arc<ManualClock>>::spawn(limit, Arc::clone(&clock));
        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(!bucket.allow());
        clock.advance(1000.0);
        // nothing recomputed the level yet
        assert!(!bucket.allow());
        assert_eq!(0.0, bucket.level());
    }

    #[test]
    fn replenisher_refills_tokens() {
        let clock = Arc::new(ManualClock::default());
        let limit = RateLimit::per_second_and_capacity(nonzero!(100u32), nonzero!(3u32));
        let bucket = EagerTokenBucket::<Arc<ManualClock>>::spawn(limit, Arc::clone(&clock));
        for _ in 0..3 {
            assert!(bucket.allow());
        }
        assert!(!bucket.allow());
        clock.advance(1.0);
        let deadline = Instant::now() + Duration::from_secs(5);
        while bucket.level() < 3.0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(3.0, bucket.level());
        assert!(bucket.allow());
    }

    #[test]
    fn replenisher_drains_water() {
        let clock = Arc::new(ManualClock::default());
        let limit = RateLimit::per_second_and_capacity(nonzero!(100u32), nonzero!(2u32));
        let bucket = EagerLeakyBucket::<Arc<ManualClock>>::spawn(limit, Arc::clone(&clock));
        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(!bucket.allow());
        clock.advance(1.0);
        let deadline = Instant::now() + Duration::from_secs(5);
        while bucket.level() > 0.0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(0.0, bucket.level());
        assert!(bucket.allow());
    }

    #[test]
    fn drop_stops_the_thread() {
        // a 100s tick: drop must not wait for it
        let limit = RateLimit::new(0.01, 1.0).unwrap();
        let bucket = EagerLeakyBucket::<StdClock>::spawn(limit, StdClock::default());
        let shared = Arc::downgrade(&bucket.bucket);
        assert!(bucket.is_running());

        let start = Instant::now();
        drop(bucket);
        assert!(start.elapsed() < Duration::from_secs(5));
        // the thread released its handle on the bucket when it exited
        assert!(shared.upgrade().is_none());
    }

    #[test]
    fn shutdown_freezes_level() {
        let clock = Arc::new(ManualClock::default());
        let limit = RateLimit::per_second_and_capacity(nonzero!(100u32), nonzero!(1u32));
        let mut bucket = EagerTokenBucket::<Arc<ManualClock>>::spawn(limit, Arc::clone(&clock));
        assert!(bucket.allow());
        bucket.shutdown();
        assert!(!bucket.is_running());
        bucket.shutdown();
        clock.advance(10.0);
        thread::sleep(Duration::from_millis(50));
        assert!(!bucket.allow());
    }

    #[test]
    fn configure_validates_before_spawning() {
        assert_eq!(
            Some(ConfigurationError::InvalidRate(0.0)),
            EagerLeakyBucket::configure(0.0, 1.0).err()
        );
    }
}
