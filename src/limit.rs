use std::num::NonZeroU32;
use std::time::Duration;

use crate::ConfigurationError;

const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Configuration for a [`FixedWindowLimiter`](crate::FixedWindowLimiter): at
/// most `rate` admissions per `cycle`.
///
/// # Examples
///
/// ```rust
/// use admission::Window;
/// use std::num::NonZeroU32;
/// use std::time::Duration;
///
/// let window = Window::new(2, Duration::from_secs(1)).unwrap();
/// assert_eq!(window, Window::per_second(NonZeroU32::new(2).unwrap()));
///
/// assert!(Window::new(0, Duration::from_secs(1)).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "RawWindow")
)]
pub struct Window {
    rate: u32,
    cycle: Duration,
}

impl Window {
    /// Creates a window admitting `rate` requests every `cycle`.
    pub fn new(rate: u32, cycle: Duration) -> Result<Self, ConfigurationError> {
        if rate == 0 {
            return Err(ConfigurationError::ZeroRate);
        }
        if cycle.is_zero() {
            return Err(ConfigurationError::ZeroCycle);
        }
        Ok(Self { rate, cycle })
    }

    /// `rate` admissions per second.
    pub const fn per_second(rate: NonZeroU32) -> Self {
        Self {
            rate: rate.get(),
            cycle: Duration::from_secs(1),
        }
    }

    /// `rate` admissions per minute.
    pub const fn per_minute(rate: NonZeroU32) -> Self {
        Self {
            rate: rate.get(),
            cycle: Duration::from_secs(60),
        }
    }

    /// `rate` admissions per hour.
    pub const fn per_hour(rate: NonZeroU32) -> Self {
        Self {
            rate: rate.get(),
            cycle: Duration::from_secs(3600),
        }
    }

    /// Maximum number of admissions in one cycle.
    pub const fn rate(&self) -> u32 {
        self.rate
    }

    /// Length of one counting cycle.
    pub const fn cycle(&self) -> Duration {
        self.cycle
    }
}

/// What a [`FixedWindowLimiter`](crate::FixedWindowLimiter) does with a
/// request that arrives after the current window is exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum OverflowPolicy {
    /// Return `false` immediately.
    #[default]
    Reject,
    /// Suspend the caller until the window rolls over, then admit it.
    Block,
}

/// Configuration for the bucket limiters: the sustained rate in units per
/// second and the bucket capacity, which bounds the burst.
///
/// # Examples
///
/// ```rust
/// use admission::RateLimit;
/// use std::num::NonZeroU32;
///
/// // 100 requests per second, burst of 200
/// let limit = RateLimit::per_second_and_capacity(
///     NonZeroU32::new(100).unwrap(),
///     NonZeroU32::new(200).unwrap()
/// );
/// assert_eq!(limit.rate_per_second(), 100.0);
/// assert_eq!(limit.capacity(), 200.0);
///
/// // fractional rates go through the fallible constructor
/// let limit = RateLimit::new(0.5, 3.0).unwrap();
/// assert_eq!(limit.rate_per_minute(), 30.0);
/// assert!(RateLimit::new(f64::NAN, 3.0).is_err());
/// ```
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "RawRateLimit")
)]
pub struct RateLimit {
    pub(crate) rate: f64,
    pub(crate) capacity: f64,
}

impl std::fmt::Debug for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RateLimit(rate_per_second={}, capacity={})",
            self.rate_per_second(),
            self.capacity()
        )
    }
}

impl RateLimit {
    /// Creates a rate limit from a per-second rate and a capacity.
    ///
    /// Both values must be finite and greater than zero.
    pub fn new(rate_per_second: f64, capacity: f64) -> Result<Self, ConfigurationError> {
        if !(rate_per_second.is_finite() && rate_per_second > 0.0) {
            return Err(ConfigurationError::InvalidRate(rate_per_second));
        }
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(ConfigurationError::InvalidCapacity(capacity));
        }
        Ok(Self {
            rate: rate_per_second,
            capacity,
        })
    }

    /// `rate` units per second; the capacity equals the rate, so one
    /// second's worth of requests may burst.
    pub const fn per_second(rate: NonZeroU32) -> Self {
        Self {
            rate: rate.get() as f64,
            capacity: rate.get() as f64,
        }
    }

    /// `rate` units per second with an explicit capacity.
    pub const fn per_second_and_capacity(rate: NonZeroU32, capacity: NonZeroU32) -> Self {
        Self {
            rate: rate.get() as f64,
            capacity: capacity.get() as f64,
        }
    }

    /// `rate` units per minute, replenished evenly; the whole minute's worth
    /// may burst.
    pub const fn per_minute(rate: NonZeroU32) -> Self {
        Self {
            rate: rate.get() as f64 / SECONDS_PER_MINUTE,
            capacity: rate.get() as f64,
        }
    }

    /// `rate` units per hour, replenished evenly; the whole hour's worth
    /// may burst.
    pub const fn per_hour(rate: NonZeroU32) -> Self {
        Self {
            rate: rate.get() as f64 / SECONDS_PER_HOUR,
            capacity: rate.get() as f64,
        }
    }

    /// Replaces the capacity of this rate limit.
    pub const fn with_capacity(mut self, capacity: NonZeroU32) -> Self {
        self.capacity = capacity.get() as f64;
        self
    }

    pub const fn rate_per_second(&self) -> f64 {
        self.rate
    }

    pub const fn rate_per_minute(&self) -> f64 {
        self.rate * SECONDS_PER_MINUTE
    }

    pub const fn rate_per_hour(&self) -> f64 {
        self.rate * SECONDS_PER_HOUR
    }

    /// Maximum bucket level.
    pub const fn capacity(&self) -> f64 {
        self.capacity
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawWindow {
    rate: u32,
    cycle: Duration,
}

#[cfg(feature = "serde")]
impl TryFrom<RawWindow> for Window {
    type Error = ConfigurationError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Window::new(raw.rate, raw.cycle)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawRateLimit {
    rate_per_second: f64,
    capacity: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawRateLimit> for RateLimit {
    type Error = ConfigurationError;

    fn try_from(raw: RawRateLimit) -> Result<Self, Self::Error> {
        RateLimit::new(raw.rate_per_second, raw.capacity)
    }
}
