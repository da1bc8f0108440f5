#![doc = include_str!("../README.md")]
//!
//! # Core Components
//!
//! - [`Limiter`] - The admission capability: `allow()` / `check()`
//! - [`FixedWindowLimiter`] - Counts admissions per fixed cycle, rejecting or blocking on overflow
//! - [`LeakyBucketLimiter`] - A bucket that drains at a constant rate and overflows when filled too fast
//! - [`TokenBucketLimiter`] - A bucket refilled with tokens at a constant rate
//! - [`EagerBucket`] - Bucket variant replenished by a background thread with an explicit lifecycle
//! - [`Window`], [`RateLimit`] - Validated configuration
//! - [`Clock`] trait and implementations for time sources
//!
//! # Quick Start
//!
//! ```rust
//! use std::num::NonZeroU32;
//!
//! use admission::{Limiter, RateLimit, TokenBucketLimiter};
//!
//! // 10 requests per second, burst of 20
//! let limit = RateLimit::per_second_and_capacity(
//!     NonZeroU32::new(10).unwrap(),
//!     NonZeroU32::new(20).unwrap()
//! );
//! let limiter = TokenBucketLimiter::new(limit);
//!
//! if limiter.allow() {
//!     println!("admitted");
//! }
//! ```

mod bucket;
mod clock;
mod eager;
mod error;
#[cfg(feature = "async")]
pub mod futures;
mod leaky;
mod limit;
mod limiter;
mod token;
mod window;

pub use bucket::{BucketLimiter, Flow};
#[cfg(feature = "tokio")]
pub use clock::TokioClock;
pub use clock::{Clock, ManualClock, StdClock};
#[cfg(feature = "quanta")]
pub use clock::{FastClock, QuantaClock};
pub use eager::{EagerBucket, EagerLeakyBucket, EagerTokenBucket};
pub use error::*;
#[cfg(feature = "async")]
pub use self::futures::RateLimitedStreamExt;
pub use leaky::{Leak, LeakyBucketLimiter};
pub use limit::{OverflowPolicy, RateLimit, Window};
pub use limiter::Limiter;
pub use token::{Refill, TokenBucketLimiter};
pub use window::FixedWindowLimiter;

pub(crate) mod private {
    pub trait Sealed {}
}
