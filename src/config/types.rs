//! Core configuration types for catalog scraping
//!
//! This module contains the main `ScrapeConfig` struct and the selector set
//! that defines where records live in the listing DOM.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CSS selectors describing the listing page structure.
///
/// These are the seam to the thin selector layer: the pipeline itself never
/// interprets them, it only hands them to the browser surface. Defaults match
/// the reference anime catalog layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// One element per catalog item.
    pub(crate) item_container: String,
    /// Nested link carrying the display title and the record URL.
    pub(crate) title_link: String,
    /// Poster image inside an item container.
    pub(crate) poster_image: String,
    /// Attribute holding the real image URL when `src` is lazy-loaded empty.
    pub(crate) lazy_image_attr: String,
    /// The "next page" control. Must exclude the disabled state so an
    /// exhausted pager resolves to no element at all.
    pub(crate) next_control: String,
    /// Close controls of recognized overlays/modals.
    pub(crate) overlay_close: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item_container: "div.anime-block-ul > ul > li".to_string(),
            title_link: "h3.film-name > a".to_string(),
            poster_image: "img.film-poster-img".to_string(),
            lazy_image_attr: "data-src".to_string(),
            next_control: "div.ap__-btn-next > a:not(.disabled)".to_string(),
            overlay_close: vec![
                ".close".to_string(),
                ".btn-close".to_string(),
                ".modal-close".to_string(),
            ],
        }
    }
}

/// Main configuration struct for one scrape run.
///
/// Build through [`ScrapeConfig::builder`], which validates the base URL and
/// the pacing/retry bounds before a config can exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Site root, e.g. `https://9animetv.to`.
    ///
    /// **INVARIANT:** always a parseable absolute URL with a host
    /// (validated in the builder).
    pub(crate) base_url: String,

    /// Path of the paginated listing relative to the base URL.
    pub(crate) listing_path: String,

    /// Where the aggregate is written (atomically) at the end of the run.
    pub(crate) output_path: PathBuf,

    /// Bounded wait for any single readiness predicate, in seconds.
    pub(crate) wait_timeout_secs: u64,

    /// Interval between readiness polls, in milliseconds.
    pub(crate) poll_interval_ms: u64,

    /// Maximum attempts for retryable operations (navigation, page
    /// extraction). 1 means no retry.
    pub(crate) max_attempts: u32,

    /// Delay between retry attempts, in milliseconds.
    pub(crate) retry_delay_ms: u64,

    /// Lower bound of the randomized pacing delay, in milliseconds.
    pub(crate) pace_min_ms: u64,

    /// Upper bound of the randomized pacing delay, in milliseconds.
    ///
    /// **INVARIANT:** `pace_min_ms <= pace_max_ms` (validated in builder).
    pub(crate) pace_max_ms: u64,

    /// Run the browser headless. Disable to watch a run live.
    pub(crate) headless: bool,

    /// Deduplicate by record link instead of display title.
    ///
    /// Titles can collide across distinct catalog entries, so link identity
    /// is the default. Set to `false` for title-only identity.
    pub(crate) dedup_by_link: bool,

    /// Chrome user data directory for browser profile isolation.
    /// When unset, a per-process temp directory is used and removed on
    /// session release.
    #[serde(skip)]
    pub(crate) chrome_data_dir: Option<PathBuf>,

    /// DOM structure of the listing page.
    pub(crate) selectors: ListingSelectors,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            listing_path: "/az-list".to_string(),
            output_path: PathBuf::from("anime_data_paginated.json"),
            wait_timeout_secs: 20,
            poll_interval_ms: 250,
            max_attempts: 3,
            retry_delay_ms: 1500,
            pace_min_ms: 1800,
            pace_max_ms: 3500,
            headless: true,
            dedup_by_link: true,
            chrome_data_dir: None,
            selectors: ListingSelectors::default(),
        }
    }
}

impl ScrapeConfig {
    /// Start building a config. `base_url` is required before `build()`
    /// becomes available.
    #[must_use]
    pub fn builder() -> super::builder::ScrapeConfigBuilder<()> {
        super::builder::ScrapeConfigBuilder::default()
    }

    /// Set a Chrome user data directory for profile isolation.
    #[must_use]
    pub fn with_chrome_data_dir(mut self, dir: PathBuf) -> Self {
        self.chrome_data_dir = Some(dir);
        self
    }
}
