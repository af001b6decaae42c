//! Navigation coordination and readiness waits
//!
//! A page transition never returns until a caller-specified readiness
//! predicate holds, with a bounded timeout. Fixed sleeps are nondeterministic
//! under variable network and render latency, so readiness is polled.

use chromiumoxide::Page;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::error::{ScrapeError, ScrapeResult};

/// A boolean condition over page state that gates navigation continuation.
///
/// Waiting on page content rather than the URL: a changed URL proves the
/// transition started, item presence proves it finished and rendered.
#[derive(Debug, Clone)]
pub enum Readiness {
    /// The element exists, has a visible box, and is not disabled.
    ElementInteractable(String),
    /// At least one item container matches the selector.
    ItemsPresent(String),
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementInteractable(sel) => write!(f, "element '{sel}' interactable"),
            Self::ItemsPresent(sel) => write!(f, "items '{sel}' present"),
        }
    }
}

impl Readiness {
    /// Evaluate the predicate once. A CDP hiccup during a poll counts as
    /// "not ready yet", not as failure - the deadline is the failure bound.
    async fn holds(&self, page: &Page) -> bool {
        match self {
            Self::ElementInteractable(sel) => {
                let js = format!(
                    r"(function() {{
                        const el = document.querySelector({});
                        if (!el) return false;
                        const rect = el.getBoundingClientRect();
                        if (rect.width === 0 || rect.height === 0) return false;
                        return !el.disabled && !el.classList.contains('disabled');
                    }})()",
                    js_string(sel)
                );
                eval_bool(page, &js).await
            }
            Self::ItemsPresent(sel) => {
                let js = format!(
                    "document.querySelectorAll({}).length > 0",
                    js_string(sel)
                );
                eval_bool(page, &js).await
            }
        }
    }
}

/// Quote a selector for embedding in a JS expression.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

async fn eval_bool(page: &Page, js: &str) -> bool {
    match page.evaluate(js).await {
        Ok(result) => result.into_value::<bool>().unwrap_or(false),
        Err(e) => {
            trace!("Readiness poll failed: {e}");
            false
        }
    }
}

/// Block until `readiness` holds on `page`, polling at `poll_interval`, for
/// at most `timeout`.
///
/// # Errors
///
/// [`ScrapeError::NavigationTimeout`] naming the unmet condition once the
/// deadline passes. The caller decides whether that is retryable.
pub async fn wait_until(
    page: &Page,
    readiness: &Readiness,
    timeout: Duration,
    poll_interval: Duration,
) -> ScrapeResult<()> {
    let start = Instant::now();

    loop {
        if readiness.holds(page).await {
            debug!("Ready after {:?}: {readiness}", start.elapsed());
            return Ok(());
        }

        if start.elapsed() >= timeout {
            let url = page
                .url()
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| "about:blank".to_string());
            return Err(ScrapeError::NavigationTimeout {
                url,
                condition: readiness.to_string(),
                waited_secs: timeout.as_secs(),
            });
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Issue a page transition and block until `readiness` holds.
pub async fn goto_and_wait(
    page: &Page,
    url: &str,
    readiness: &Readiness,
    timeout: Duration,
    poll_interval: Duration,
) -> ScrapeResult<()> {
    debug!("Navigating to {url}");
    page.goto(url)
        .await
        .map_err(|e| ScrapeError::Browser(format!("navigation to {url} failed: {e}")))?;
    wait_until(page, readiness, timeout, poll_interval).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_describes_its_condition() {
        let r = Readiness::ItemsPresent("div.anime-block-ul > ul > li".into());
        assert_eq!(r.to_string(), "items 'div.anime-block-ul > ul > li' present");
        let r = Readiness::ElementInteractable("a[href=\"/az-list\"]".into());
        assert_eq!(r.to_string(), "element 'a[href=\"/az-list\"]' interactable");
    }

    #[test]
    fn selectors_are_quoted_for_js() {
        assert_eq!(js_string("a[href=\"/az-list\"]"), r#""a[href=\"/az-list\"]""#);
    }
}
