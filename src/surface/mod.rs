//! Listing surface: the boundary to the page-fetch/parse layer
//!
//! The pipeline core consumes one capability: "given a loaded session,
//! return queryable structural elements". [`ListingSurface`] is that
//! capability as a trait, so the pagination engine and extractor run
//! identically against a live Chromium page or a test double.

pub mod chromium;

pub use chromium::CatalogSurface;

use crate::error::ScrapeResult;

/// The raw fields the selector layer saw for one item container, before any
/// validation. Every field may be absent; the extractor decides what makes a
/// usable record.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    /// Untrimmed display text of the nested title link.
    pub title: Option<String>,
    /// The title link's href, possibly relative.
    pub link: Option<String>,
    /// The poster image's `src` attribute.
    pub image: Option<String>,
    /// The poster image's lazy-load attribute, used when `src` is empty.
    pub image_lazy: Option<String>,
}

/// A loaded, queryable listing page.
///
/// Implementations must uphold two contracts:
/// - `raw_items` isolates per-container failures: a bad container yields a
///   degenerate [`RawItem`], never an error for the whole page.
/// - `next_page_url` resolves to `Some` only when the next control exists,
///   is not disabled, and exposes a usable absolute target URL. That is the
///   pagination engine's sole termination signal.
pub trait ListingSurface {
    /// The current document URL.
    fn current_url(&self) -> impl Future<Output = ScrapeResult<String>> + Send;

    /// One [`RawItem`] per item container currently in the DOM.
    fn raw_items(&self) -> impl Future<Output = ScrapeResult<Vec<RawItem>>> + Send;

    /// Resolved absolute URL of the next listing page, if one exists.
    fn next_page_url(&self) -> impl Future<Output = ScrapeResult<Option<String>>> + Send;

    /// Navigate to `url` and block until the item containers are ready.
    fn open(&mut self, url: &str) -> impl Future<Output = ScrapeResult<()>> + Send;

    /// Behavioral settling between actions: pacing plus anomaly resolution.
    /// Never fails; implementations contain their own errors.
    fn settle(&mut self) -> impl Future<Output = ()> + Send;
}
