//! Read accessors for `ScrapeConfig`
//!
//! Duration-typed getters convert the raw millisecond/second fields once so
//! call sites never repeat the conversion.

use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use super::types::{ListingSelectors, ScrapeConfig};

impl ScrapeConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn listing_path(&self) -> &str {
        &self.listing_path
    }

    /// The absolute listing URL (base + listing path).
    ///
    /// # Errors
    ///
    /// Fails only if the listing path cannot be joined onto the base URL;
    /// the base URL itself was validated at build time.
    pub fn listing_url(&self) -> anyhow::Result<Url> {
        let base = Url::parse(&self.base_url)?;
        Ok(base.join(&self.listing_path)?)
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    #[must_use]
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    #[must_use]
    pub fn wait_timeout_secs(&self) -> u64 {
        self.wait_timeout_secs
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub fn pace_bounds_ms(&self) -> (u64, u64) {
        (self.pace_min_ms, self.pace_max_ms)
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn dedup_by_link(&self) -> bool {
        self.dedup_by_link
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }

    #[must_use]
    pub fn selectors(&self) -> &ListingSelectors {
        &self.selectors
    }
}

impl ListingSelectors {
    #[must_use]
    pub fn item_container(&self) -> &str {
        &self.item_container
    }

    #[must_use]
    pub fn title_link(&self) -> &str {
        &self.title_link
    }

    #[must_use]
    pub fn poster_image(&self) -> &str {
        &self.poster_image
    }

    #[must_use]
    pub fn lazy_image_attr(&self) -> &str {
        &self.lazy_image_attr
    }

    #[must_use]
    pub fn next_control(&self) -> &str {
        &self.next_control
    }

    #[must_use]
    pub fn overlay_close(&self) -> &[String] {
        &self.overlay_close
    }
}
