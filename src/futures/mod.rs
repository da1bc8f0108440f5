//! Async adapters over any [`Limiter`], driven by tokio timers.
//!
//! The adapters wait by sleeping for the retry hint of a rejected
//! [`Limiter::check`]. A [`FixedWindowLimiter`](crate::FixedWindowLimiter)
//! with [`OverflowPolicy::Block`](crate::OverflowPolicy::Block) blocks the
//! executor thread instead; configure it with `Reject` when used here.
//!
//! A bucket whose capacity is below one unit never admits anything, so
//! waiting on it never completes.

mod stream;
mod timer;

pub use stream::RateLimitedStream;

use futures::Stream;

use crate::Limiter;

/// Waits until `limiter` admits one unit of work.
///
/// There is no upper bound on the wait. A bucket configured with a capacity
/// below `1.0` rejects every call, and this future then never resolves.
///
/// # Examples
///
/// ```rust
/// use admission::futures::until_ready;
/// use admission::LeakyBucketLimiter;
///
/// # async fn example() {
/// let limiter = LeakyBucketLimiter::configure(10.0, 1.0).unwrap();
/// until_ready(&limiter).await;
/// // admitted
/// # }
/// ```
pub async fn until_ready<L: Limiter + ?Sized>(limiter: &L) {
    loop {
        match limiter.check() {
            Ok(()) => return,
            Err(limited) => timer::sleep(limited.earliest_retry_after()).await,
        }
    }
}

pub trait RateLimitedStreamExt: Stream + Sized {
    /// Holds every item of this stream until `limiter` admits it.
    fn rate_limit<L: Limiter>(self, limiter: L) -> RateLimitedStream<Self, L>;
}

impl<S: Stream> RateLimitedStreamExt for S {
    fn rate_limit<L: Limiter>(self, limiter: L) -> RateLimitedStream<Self, L> {
        RateLimitedStream::new(self, limiter)
    }
}
