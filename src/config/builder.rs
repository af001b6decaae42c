//! Type-safe builder for `ScrapeConfig` using the typestate pattern
//!
//! The builder refuses to produce a config until a base URL has been
//! supplied, and validates the URL and the numeric bounds at `build()` time.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;
use url::Url;

use super::types::{ListingSelectors, ScrapeConfig};

/// Type state: a base URL has been provided and `build()` is available.
pub struct Complete;

pub struct ScrapeConfigBuilder<State = ()> {
    pub(crate) base_url: Option<String>,
    pub(crate) listing_path: String,
    pub(crate) output_path: PathBuf,
    pub(crate) wait_timeout_secs: u64,
    pub(crate) poll_interval_ms: u64,
    pub(crate) max_attempts: u32,
    pub(crate) retry_delay_ms: u64,
    pub(crate) pace_min_ms: u64,
    pub(crate) pace_max_ms: u64,
    pub(crate) headless: bool,
    pub(crate) dedup_by_link: bool,
    pub(crate) selectors: ListingSelectors,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ScrapeConfigBuilder<()> {
    fn default() -> Self {
        let defaults = ScrapeConfig::default();
        Self {
            base_url: None,
            listing_path: defaults.listing_path,
            output_path: defaults.output_path,
            wait_timeout_secs: defaults.wait_timeout_secs,
            poll_interval_ms: defaults.poll_interval_ms,
            max_attempts: defaults.max_attempts,
            retry_delay_ms: defaults.retry_delay_ms,
            pace_min_ms: defaults.pace_min_ms,
            pace_max_ms: defaults.pace_max_ms,
            headless: defaults.headless,
            dedup_by_link: defaults.dedup_by_link,
            selectors: defaults.selectors,
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfigBuilder<()> {
    /// Set the site root. Transitions the builder to the buildable state.
    #[must_use]
    pub fn base_url(self, url: impl Into<String>) -> ScrapeConfigBuilder<Complete> {
        ScrapeConfigBuilder {
            base_url: Some(url.into()),
            listing_path: self.listing_path,
            output_path: self.output_path,
            wait_timeout_secs: self.wait_timeout_secs,
            poll_interval_ms: self.poll_interval_ms,
            max_attempts: self.max_attempts,
            retry_delay_ms: self.retry_delay_ms,
            pace_min_ms: self.pace_min_ms,
            pace_max_ms: self.pace_max_ms,
            headless: self.headless,
            dedup_by_link: self.dedup_by_link,
            selectors: self.selectors,
            _phantom: PhantomData,
        }
    }
}

impl<State> ScrapeConfigBuilder<State> {
    /// Listing path relative to the base URL (default `/az-list`).
    #[must_use]
    pub fn listing_path(mut self, path: impl Into<String>) -> Self {
        self.listing_path = path.into();
        self
    }

    /// Output file for the aggregate JSON.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Bounded wait for readiness predicates, in seconds.
    #[must_use]
    pub fn wait_timeout_secs(mut self, secs: u64) -> Self {
        self.wait_timeout_secs = secs;
        self
    }

    /// Interval between readiness polls, in milliseconds.
    #[must_use]
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Attempt budget for retryable operations.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay between retry attempts, in milliseconds.
    #[must_use]
    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Randomized pacing bounds, in milliseconds.
    #[must_use]
    pub fn pace_bounds_ms(mut self, min: u64, max: u64) -> Self {
        self.pace_min_ms = min;
        self.pace_max_ms = max;
        self
    }

    /// Run the browser with a visible window.
    #[must_use]
    pub fn headed(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Choose the record identity key: `true` for link (default), `false`
    /// for display title.
    #[must_use]
    pub fn dedup_by_link(mut self, by_link: bool) -> Self {
        self.dedup_by_link = by_link;
        self
    }

    /// Override the listing selectors.
    #[must_use]
    pub fn selectors(mut self, selectors: ListingSelectors) -> Self {
        self.selectors = selectors;
        self
    }
}

impl ScrapeConfigBuilder<Complete> {
    /// Validate and produce the config.
    ///
    /// # Errors
    ///
    /// Fails if the base URL is not an absolute http(s) URL with a host,
    /// if the pacing bounds are inverted, or if `max_attempts` is zero.
    pub fn build(self) -> Result<ScrapeConfig> {
        let base_url = self
            .base_url
            .ok_or_else(|| anyhow!("base URL missing despite Complete state"))?;

        let parsed = Url::parse(&base_url)
            .map_err(|e| anyhow!("invalid base URL '{base_url}': {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "base URL '{base_url}' must use http or https, got '{}'",
                parsed.scheme()
            ));
        }
        if parsed.host_str().is_none() {
            return Err(anyhow!("base URL '{base_url}' has no host"));
        }

        if self.pace_min_ms > self.pace_max_ms {
            return Err(anyhow!(
                "pacing bounds inverted: min {}ms > max {}ms",
                self.pace_min_ms,
                self.pace_max_ms
            ));
        }

        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }

        Ok(ScrapeConfig {
            // Store without a trailing slash so joins with the listing path
            // are predictable.
            base_url: base_url.trim_end_matches('/').to_string(),
            listing_path: self.listing_path,
            output_path: self.output_path,
            wait_timeout_secs: self.wait_timeout_secs,
            poll_interval_ms: self.poll_interval_ms,
            max_attempts: self.max_attempts,
            retry_delay_ms: self.retry_delay_ms,
            pace_min_ms: self.pace_min_ms,
            pace_max_ms: self.pace_max_ms,
            headless: self.headless,
            dedup_by_link: self.dedup_by_link,
            chrome_data_dir: None,
            selectors: self.selectors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let config = ScrapeConfig::builder()
            .base_url("https://9animetv.to")
            .build()
            .expect("valid config");
        assert_eq!(config.base_url, "https://9animetv.to");
        assert_eq!(config.listing_path, "/az-list");
        assert_eq!(config.wait_timeout_secs, 20);
        assert!(config.dedup_by_link);
    }

    #[test]
    fn strips_trailing_slash() {
        let config = ScrapeConfig::builder()
            .base_url("https://9animetv.to/")
            .build()
            .expect("valid config");
        assert_eq!(config.base_url, "https://9animetv.to");
    }

    #[test]
    fn rejects_bad_scheme_and_inverted_pacing() {
        assert!(
            ScrapeConfig::builder()
                .base_url("ftp://example.com")
                .build()
                .is_err()
        );
        assert!(
            ScrapeConfig::builder()
                .base_url("https://example.com")
                .pace_bounds_ms(5000, 100)
                .build()
                .is_err()
        );
        assert!(
            ScrapeConfig::builder()
                .base_url("https://example.com")
                .max_attempts(0)
                .build()
                .is_err()
        );
    }
}
