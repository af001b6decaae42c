//! Bounded retry with delay
//!
//! Applied selectively to network-sensitive operations (navigation,
//! extraction of a page) - never around the whole pipeline, which would
//! silently re-run completed work and corrupt deduplication state.

use log::{debug, warn};
use std::time::Duration;

use crate::error::{ScrapeError, ScrapeResult};

/// Invoke `op` up to `max_attempts` times, sleeping `delay` between
/// attempts. Each failure is logged with its attempt number; the final
/// failure is re-raised unchanged.
///
/// Errors the taxonomy marks non-retryable short-circuit immediately: a
/// schema violation or structural mismatch will not get better by waiting.
pub async fn with_retry<T, F>(
    label: &str,
    max_attempts: u32,
    delay: Duration,
    mut op: F,
) -> ScrapeResult<T>
where
    F: AsyncFnMut() -> ScrapeResult<T>,
{
    debug_assert!(max_attempts >= 1);

    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{label} succeeded on attempt {attempt}/{max_attempts}");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => {
                warn!("{label} failed with non-retryable error: {e}");
                return Err(e);
            }
            Err(e) if attempt >= max_attempts => {
                warn!("{label} failed on final attempt {attempt}/{max_attempts}: {e}");
                return Err(e);
            }
            Err(e) => {
                warn!("{label} failed on attempt {attempt}/{max_attempts}, retrying in {delay:?}: {e}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_failing_op_runs_exactly_max_attempts() {
        let mut calls = 0u32;
        let result: ScrapeResult<()> = with_retry(
            "doomed",
            3,
            Duration::from_millis(1),
            async || {
                calls += 1;
                Err(ScrapeError::Browser("connection reset".into()))
            },
        )
        .await;

        assert_eq!(calls, 3);
        // The original error type comes back unchanged.
        assert!(matches!(result, Err(ScrapeError::Browser(msg)) if msg == "connection reset"));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let mut calls = 0u32;
        let result = with_retry("flaky", 5, Duration::from_millis(1), async || {
            calls += 1;
            if calls < 3 {
                Err(ScrapeError::NavigationTimeout {
                    url: "https://site.to/az-list?page=2".into(),
                    condition: "items present".into(),
                    waited_secs: 20,
                })
            } else {
                Ok(calls)
            }
        })
        .await;

        assert_eq!(result.expect("eventual success"), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn non_retryable_error_short_circuits() {
        let mut calls = 0u32;
        let result: ScrapeResult<()> = with_retry(
            "structural",
            5,
            Duration::from_millis(1),
            async || {
                calls += 1;
                Err(ScrapeError::StructuralMismatch {
                    page: 3,
                    detail: "layout changed".into(),
                })
            },
        )
        .await;

        assert_eq!(calls, 1);
        assert!(matches!(
            result,
            Err(ScrapeError::StructuralMismatch { page: 3, .. })
        ));
    }
}
