//! Bounded retry for version-conflicted writes.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::CatalogError;

/// Run `attempt` until it succeeds, fails non-retriably, or exhausts the
/// policy's attempt budget.
///
/// Only write conflicts (version mismatch, create race) are retried; every
/// other error - including store unavailability - passes straight through.
pub(crate) async fn with_write_retries<T, F>(
    policy: RetryPolicy,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, CatalogError>
where
    F: AsyncFnMut() -> Result<T, CatalogError>,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retriable(&err) => {
                if attempts >= policy.max_attempts {
                    warn!(operation, attempts, "write conflict persisted, giving up");
                    return Err(CatalogError::ConflictRetriesExhausted {
                        operation,
                        attempts,
                    });
                }
                let delay = backoff_delay(policy, attempts);
                debug!(operation, attempt = attempts, ?delay, "lost write race, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_retriable(err: &CatalogError) -> bool {
    matches!(err, CatalogError::Store(inner) if inner.is_write_conflict())
}

/// Exponential backoff with full jitter, capped by the policy.
fn backoff_delay(policy: RetryPolicy, lost_attempts: u32) -> Duration {
    let doublings = lost_attempts.saturating_sub(1).min(16);
    let uncapped = policy.backoff_base.saturating_mul(1 << doublings);
    let capped = uncapped.min(policy.backoff_cap);
    let cap_ms = u64::try_from(capped.as_millis()).unwrap_or(u64::MAX).max(1);
    Duration::from_millis(rand::rng().random_range(0..=cap_ms))
}
