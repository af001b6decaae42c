//! catascrape: browser-driven, paginated, stateful catalog extraction.
//!
//! One Chromium session walks an A-Z listing page by page, extracts
//! structured records per item with per-item failure isolation,
//! deduplicates across pages, and atomically persists a page-keyed JSON
//! document.

pub mod behavior;
pub mod browser;
pub mod config;
pub mod error;
pub mod extractor;
pub mod navigation;
pub mod pagination;
pub mod persistence;
pub mod pipeline;
pub mod resilience;
pub mod store;
pub mod surface;

pub use browser::{BrowserSession, find_browser_executable, suppress_automation_signals};
pub use config::{ListingSelectors, ScrapeConfig};
pub use error::{ScrapeError, ScrapeResult};
pub use extractor::{ExtractedPage, Record, page_key, page_ordinal};
pub use navigation::Readiness;
pub use pagination::{EngineState, PaginationEngine};
pub use persistence::{save, validate};
pub use resilience::with_retry;
pub use store::{Aggregate, DedupStore, IdentityKey};
pub use surface::{CatalogSurface, ListingSurface, RawItem};

/// Run one complete scrape with the given configuration.
pub async fn scrape(config: ScrapeConfig) -> ScrapeResult<()> {
    pipeline::run(config).await
}
