//! Behavioral layer: pacing and anomaly resolution
//!
//! Randomized inter-action delays avoid the periodic signature of a fixed
//! sleep, and transient UI anomalies (extra windows, modal overlays) are
//! resolved before every navigation attempt. Nothing in this module ever
//! raises: failures are contained locally and logged, never hidden.

use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use log::{debug, warn};
use rand::Rng;
use std::time::Duration;

/// Sample a pacing delay from the bounded range. Kept separate from the
/// sleep so the sampling contract is testable.
#[must_use]
pub fn sample_pace(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    let ms = rand::rng().random_range(min_ms..=max_ms);
    Duration::from_millis(ms)
}

/// Suspend the calling flow for a randomized duration within the bounds.
pub async fn pace(min_ms: u64, max_ms: u64) {
    let delay = sample_pace(min_ms, max_ms);
    debug!("Pacing for {delay:?}");
    tokio::time::sleep(delay).await;
}

/// Close every browser target beyond the canonical page and dismiss any
/// recognized overlay close controls.
///
/// The first-opened page is canonical; anything else is a popup. Each
/// individual failure is logged and swallowed - local recovery only.
pub async fn resolve_anomalies(browser: &Browser, canonical: &Page, close_selectors: &[String]) {
    close_extra_targets(browser, canonical).await;
    dismiss_overlays(canonical, close_selectors).await;
}

async fn close_extra_targets(browser: &Browser, canonical: &Page) {
    let pages = match browser.pages().await {
        Ok(pages) => pages,
        Err(e) => {
            warn!("Could not enumerate browser targets: {e}");
            return;
        }
    };

    for page in pages {
        if page.target_id() == canonical.target_id() {
            continue;
        }
        debug!("Closing extra browser target {:?}", page.target_id());
        if let Err(e) = page.close().await {
            warn!("Failed to close extra target: {e}");
        }
    }
}

async fn dismiss_overlays(page: &Page, close_selectors: &[String]) {
    for selector in close_selectors {
        let buttons = match page.find_elements(selector.as_str()).await {
            Ok(buttons) => buttons,
            // No match is the common case, not an anomaly.
            Err(_) => continue,
        };

        for button in buttons {
            match button.click().await {
                Ok(_) => debug!("Dismissed overlay via '{selector}'"),
                Err(e) => debug!("Overlay close click failed for '{selector}': {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_stays_within_bounds() {
        for _ in 0..200 {
            let d = sample_pace(1800, 3500);
            assert!(d >= Duration::from_millis(1800));
            assert!(d <= Duration::from_millis(3500));
        }
    }

    #[test]
    fn degenerate_range_returns_min() {
        assert_eq!(sample_pace(500, 500), Duration::from_millis(500));
        assert_eq!(sample_pace(500, 100), Duration::from_millis(500));
    }

    #[test]
    fn consecutive_samples_vary() {
        // A wide range must not produce one constant value; tolerate the
        // astronomically unlikely all-equal draw by sampling many times.
        let first = sample_pace(0, 1_000_000);
        let varied = (0..64).any(|_| sample_pace(0, 1_000_000) != first);
        assert!(varied);
    }
}
