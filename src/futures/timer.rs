use std::time::Duration;

pub(crate) use tokio::time::{Instant, Sleep, sleep, sleep_until};

// far enough that nothing waiting on it is expected to still be around
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + delay`, saturating instead of overflowing for huge delays.
pub(crate) fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or(now + FAR_FUTURE)
}
