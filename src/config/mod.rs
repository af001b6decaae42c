//! Scrape configuration
//!
//! This module provides the configuration types and builder for catalog
//! scraping operations. The only required input is the base URL; everything
//! else (listing path, timeouts, retry policy, pacing bounds, selectors,
//! output path) has defaults matching the reference catalog layout.

mod builder;
mod getters;
mod types;

pub use builder::{Complete, ScrapeConfigBuilder};
pub use types::{ListingSelectors, ScrapeConfig};
