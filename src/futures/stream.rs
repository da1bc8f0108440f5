use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::Stream;
use pin_project_lite::pin_project;

use super::timer::{Sleep, deadline_after, sleep_until};
use crate::Limiter;

pin_project! {
    /// A stream that holds each item of the inner stream until the limiter
    /// admits it.
    ///
    /// An item is pulled from the inner stream before asking the limiter, so
    /// an admission is never spent on a stream that has nothing to offer.
    /// Items are delayed, never dropped. The timer is only created on the
    /// first rejection, so the stream can be built outside a tokio runtime
    /// as long as it is polled inside one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use admission::futures::RateLimitedStreamExt;
    /// use admission::{RateLimit, TokenBucketLimiter};
    /// use futures::stream;
    /// use std::num::NonZeroU32;
    ///
    /// # async fn example() {
    /// let limiter = TokenBucketLimiter::new(RateLimit::per_second(NonZeroU32::new(10).unwrap()));
    /// let rate_limited = stream::iter(0..100).rate_limit(limiter);
    /// # }
    /// ```
    pub struct RateLimitedStream<S, L>
    where
        S: Stream,
    {
        #[pin]
        stream: S,
        limiter: L,
        #[pin]
        delay: Option<Sleep>,
        waiting: bool,
        pending_item: Option<S::Item>,
    }
}

impl<S: Stream, L: Limiter> RateLimitedStream<S, L> {
    pub fn new(stream: S, limiter: L) -> Self {
        Self {
            stream,
            limiter,
            delay: None,
            waiting: false,
            pending_item: None,
        }
    }

    pub fn limiter(&self) -> &L {
        &self.limiter
    }

    /// Returns the inner stream, dropping any item still waiting for
    /// admission.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Stream, L: Limiter> Stream for RateLimitedStream<S, L> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if *this.waiting {
                if let Some(delay) = this.delay.as_mut().as_pin_mut() {
                    ready!(delay.poll(cx));
                }
                *this.waiting = false;
            }

            if this.pending_item.is_none() {
                match ready!(this.stream.as_mut().poll_next(cx)) {
                    Some(item) => *this.pending_item = Some(item),
                    None => return Poll::Ready(None),
                }
            }

            match this.limiter.check() {
                Ok(()) => return Poll::Ready(this.pending_item.take()),
                Err(limited) => {
                    let deadline = deadline_after(limited.earliest_retry_after());
                    if let Some(delay) = this.delay.as_mut().as_pin_mut() {
                        delay.reset(deadline);
                    } else {
                        this.delay.set(Some(sleep_until(deadline)));
                    }
                    *this.waiting = true;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = usize::from(self.pending_item.is_some());
        let (lower, upper) = self.stream.size_hint();
        (
            lower.saturating_add(pending),
            upper.and_then(|upper| upper.checked_add(pending)),
        )
    }
}

#[cfg(all(test, feature = "tokio"))]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::stream;
    use nonzero_ext::nonzero;
    use tokio_stream::StreamExt;

    use super::*;
    use crate::futures::RateLimitedStreamExt;
    use crate::{
        FixedWindowLimiter, LeakyBucketLimiter, OverflowPolicy, RateLimit, TokenBucketLimiter,
        TokioClock, Window,
    };

    #[tokio::test(start_paused = true)]
    async fn test_throttled_stream() {
        let limit = RateLimit::per_second_and_capacity(nonzero!(1u32), nonzero!(1u32));
        let limiter = TokenBucketLimiter::<TokioClock>::with_clock(limit, TokioClock::default());
        let start = tokio::time::Instant::now();

        let mut throttled = std::pin::pin!(stream::iter(vec![1, 2, 3, 4, 5]).rate_limit(limiter));
        let mut results = vec![];
        while let Some(item) = throttled.next().await {
            results.push(item);
        }

        assert_eq!(results, vec![1, 2, 3, 4, 5]);
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_stream_burst() {
        let limit = RateLimit::per_second_and_capacity(nonzero!(1u32), nonzero!(3u32));
        let limiter = TokenBucketLimiter::<TokioClock>::with_clock(limit, TokioClock::default());
        let start = tokio::time::Instant::now();

        let mut throttled = std::pin::pin!(stream::iter(vec![1, 2, 3, 4, 5]).rate_limit(limiter));
        let mut results = vec![];
        while let Some(item) = throttled.next().await {
            results.push(item);
        }

        assert_eq!(results, vec![1, 2, 3, 4, 5]);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_window_stream() {
        let limiter = FixedWindowLimiter::<TokioClock>::with_clock(
            Window::per_second(nonzero!(2u32)),
            OverflowPolicy::Reject,
            TokioClock::default(),
        );
        let start = tokio::time::Instant::now();

        let mut throttled = std::pin::pin!(stream::iter(0..6).rate_limit(limiter));
        let mut results = vec![];
        while let Some(item) = throttled.next().await {
            results.push((item, start.elapsed().as_secs()));
        }

        assert_eq!(results, vec![(0, 0), (1, 0), (2, 1), (3, 1), (4, 2), (5, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stream_spends_no_admissions() {
        let limit = RateLimit::per_second_and_capacity(nonzero!(1u32), nonzero!(2u32));
        let limiter = Arc::new(LeakyBucketLimiter::<TokioClock>::with_clock(
            limit,
            TokioClock::default(),
        ));
        let slow = stream::iter(vec![1, 2, 3]).throttle(Duration::from_secs(2));
        let start = tokio::time::Instant::now();

        let mut throttled = std::pin::pin!(slow.rate_limit(Arc::clone(&limiter)));
        let mut results = vec![];
        while let Some(item) = throttled.next().await {
            results.push((item, start.elapsed().as_secs()));
        }

        // the inner stream is the bottleneck, the limiter never held an item
        assert_eq!(results, vec![(1, 0), (2, 2), (3, 4)]);
        assert!(limiter.level() <= 1.0);
    }

    #[test]
    fn size_hint_counts_inner_items() {
        let limiter = TokenBucketLimiter::new(RateLimit::per_second(nonzero!(1u32)));
        let throttled = RateLimitedStream::new(stream::iter(0..4), limiter);
        assert_eq!((4, Some(4)), throttled.size_hint());
    }

    #[test]
    fn built_outside_runtime_then_driven_inside() {
        let limit = RateLimit::per_second_and_capacity(nonzero!(1000u32), nonzero!(1u32));
        let throttled = stream::iter(0..3).rate_limit(TokenBucketLimiter::new(limit));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let results: Vec<i32> = runtime.block_on(throttled.collect());
        assert_eq!(vec![0, 1, 2], results);
    }
}
