use std::time::Duration;

use thiserror::Error;

/// Invalid limiter settings, reported by the constructors before any limiter
/// state exists.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigurationError {
    /// A fixed window must admit at least one request per cycle.
    #[error("window rate must be greater than zero")]
    ZeroRate,
    /// A fixed window cannot have an empty cycle.
    #[error("window cycle length must be greater than zero")]
    ZeroCycle,
    /// Bucket rates must be finite and strictly positive.
    #[error("rate must be a finite number greater than zero, got {0}")]
    InvalidRate(f64),
    /// Bucket capacities must be finite and strictly positive.
    #[error("capacity must be a finite number greater than zero, got {0}")]
    InvalidCapacity(f64),
}

/// The request was not admitted.
///
/// Returned by [`Limiter::check`](crate::Limiter::check). Rejection is an
/// expected outcome rather than a fault; the limiter is left exactly as it
/// was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limited; suggested nap duration is {earliest_retry_after:?}")]
pub struct RateLimited {
    pub(crate) earliest_retry_after: Duration,
}

impl RateLimited {
    pub(crate) fn after_secs(secs: f64) -> Self {
        Self {
            earliest_retry_after: Duration::try_from_secs_f64(secs.max(0.0))
                .unwrap_or(Duration::MAX),
        }
    }

    /// The suggested duration to wait before retrying.
    pub fn earliest_retry_after(&self) -> Duration {
        self.earliest_retry_after
    }
}
