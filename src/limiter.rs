use std::sync::Arc;

use crate::RateLimited;

/// The admission capability shared by every limiter in this crate.
///
/// A limiter is configured once, then asked about each incoming unit of
/// work from any number of threads. It never calls back into the caller.
pub trait Limiter {
    /// Decides whether one unit of work may proceed now.
    ///
    /// On rejection the limiter state is left untouched and the error carries
    /// a hint for when a retry could succeed.
    fn check(&self) -> Result<(), RateLimited>;

    /// Returns `true` if one unit of work may proceed now.
    fn allow(&self) -> bool {
        self.check().is_ok()
    }
}

impl<L: Limiter + ?Sized> Limiter for &L {
    fn check(&self) -> Result<(), RateLimited> {
        (**self).check()
    }

    fn allow(&self) -> bool {
        (**self).allow()
    }
}

impl<L: Limiter + ?Sized> Limiter for Arc<L> {
    fn check(&self) -> Result<(), RateLimited> {
        (**self).check()
    }

    fn allow(&self) -> bool {
        (**self).allow()
    }
}

impl<L: Limiter + ?Sized> Limiter for Box<L> {
    fn check(&self) -> Result<(), RateLimited> {
        (**self).check()
    }

    fn allow(&self) -> bool {
        (**self).allow()
    }
}
