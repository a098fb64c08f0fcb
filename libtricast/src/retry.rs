//! Retry execution with exponential backoff
//!
//! Wraps a single outbound publish call. Only rate-limit failures are
//! retried; everything else propagates to the caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{PlatformError, Result};

/// Default attempt budget for a publish call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const MAX_BACKOFF_SECS: f64 = 32.0;

/// Backoff for the given zero-based attempt: `min(32, 2^attempt)` seconds
/// plus a fresh uniform jitter in `[0, 10%)` of that value.
pub fn backoff_delay(attempt: u32) -> Duration {
    let base = MAX_BACKOFF_SECS.min(2f64.powi(attempt as i32));
    let jitter = rand::thread_rng().gen_range(0.0..base * 0.1);
    Duration::from_secs_f64(base + jitter)
}

/// Run `op` until it succeeds, fails with a non-retryable error, or exhausts
/// `max_attempts`. Rate-limit failures back off between attempts; the final
/// rate-limit failure is propagated once the budget is spent.
pub async fn publish_with_retry<T, F, Fut>(mut op: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(attempt = attempt + 1, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_rate_limit() && attempt + 1 < max_attempts => {
                let delay = backoff_delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    "rate limited, backing off"
                );
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }

    // Only reachable with a zero attempt budget.
    Err(PlatformError::Posting(format!("no attempts made (budget {max_attempts})")).into())
}
