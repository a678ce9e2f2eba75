//! Bounded retry with exponential backoff.
//!
//! The source river had a bare `TODO: retry some times` at the bulk-flush
//! call site. This gives that TODO a concrete, bounded shape: a handful of
//! attempts with exponentially growing, capped delay, after which the
//! caller's error is returned so it can trip cancellation.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use exponential_backoff::Backoff;
use tracing::warn;

/// Default attempt count and delay bounds for [`with_backoff`].
pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);

/// Retry `op` up to `DEFAULT_ATTEMPTS` times, sleeping an exponentially
/// growing delay (capped at `DEFAULT_MAX_DELAY`) between attempts. Returns
/// the last error if every attempt fails.
pub async fn with_backoff<T, E, F, Fut>(what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let backoff = Backoff::new(DEFAULT_ATTEMPTS, DEFAULT_MIN_DELAY, DEFAULT_MAX_DELAY);
    let mut attempt = 0u32;
    let mut delays = backoff.into_iter();
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match delays.next().flatten() {
                Some(delay) => {
                    warn!(%what, attempt, ?delay, error = %e, "retrying after failure");
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
        }
    }
}
