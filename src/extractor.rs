//! Defensive per-item record extraction
//!
//! Given a loaded, ready listing page, pulls a bounded set of structured
//! records from the visible item list. One malformed item degrades
//! completeness, never correctness: it is dropped and extraction continues.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};
use crate::surface::{ListingSurface, RawItem};

/// One extracted catalog entity. Accepted into the aggregate only with a
/// non-empty title and link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    /// Poster URL. Absent when neither `src` nor the lazy-load attribute
    /// carried a value.
    pub image: Option<String>,
    /// Absolute URL of the entity page; the default identity key.
    pub link: String,
}

/// The records of one listing page, keyed by its ordinal.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub ordinal: u32,
    pub records: Vec<Record>,
}

impl ExtractedPage {
    /// The aggregate bucket key, `"page-<n>"`.
    #[must_use]
    pub fn key(&self) -> String {
        page_key(self.ordinal)
    }
}

/// Format a page ordinal as its aggregate key.
#[must_use]
pub fn page_key(ordinal: u32) -> String {
    format!("page-{ordinal}")
}

/// Read the page ordinal from a listing URL's `page` query parameter.
///
/// Derived from the URL, never from pager button state - buttons may be
/// disabled asynchronously. A missing or malformed parameter means page 1
/// (the first listing page carries no parameter at all).
#[must_use]
pub fn page_ordinal(url: &str) -> u32 {
    let Ok(parsed) = Url::parse(url) else {
        return 1;
    };
    parsed
        .query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse::<u32>().ok())
        .unwrap_or(1)
}

/// Convert a raw item into an accepted record, or `None` when the item is
/// malformed (empty title or missing link).
///
/// The image falls back from an empty `src` to the lazy-load attribute, and
/// a relative link is resolved against `page_url`.
#[must_use]
pub fn record_from_raw(raw: &RawItem, page_url: &str) -> Option<Record> {
    let title = raw.title.as_deref()?.trim();
    if title.is_empty() {
        return None;
    }

    let link = raw.link.as_deref()?.trim();
    if link.is_empty() {
        return None;
    }
    let link = match Url::parse(page_url).and_then(|base| base.join(link)) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => return None,
    };

    let image = raw
        .image
        .as_deref()
        .filter(|src| !src.trim().is_empty())
        .or_else(|| raw.image_lazy.as_deref().filter(|src| !src.trim().is_empty()))
        .map(str::to_string);

    Some(Record {
        title: title.to_string(),
        image,
        link,
    })
}

/// Extract the current page: ordinal from the URL, then one record per
/// readable item container.
///
/// # Errors
///
/// [`ScrapeError::StructuralMismatch`] when zero item containers exist after
/// a successful navigation - the site layout changed and continuing would
/// only accumulate garbage. Individual malformed items are merely skipped.
pub async fn extract_page<S: ListingSurface>(surface: &S) -> ScrapeResult<ExtractedPage> {
    let url = surface.current_url().await?;
    let ordinal = page_ordinal(&url);

    let raw_items = surface.raw_items().await?;
    if raw_items.is_empty() {
        return Err(ScrapeError::StructuralMismatch {
            page: ordinal,
            detail: format!("no item containers found at {url}"),
        });
    }

    let total = raw_items.len();
    let records: Vec<Record> = raw_items
        .iter()
        .filter_map(|raw| record_from_raw(raw, &url))
        .collect();

    let dropped = total - records.len();
    if dropped > 0 {
        warn!("Dropped {dropped}/{total} malformed items on page {ordinal}");
    }
    debug!("Extracted {} records from page {ordinal}", records.len());

    Ok(ExtractedPage { ordinal, records })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, link: &str, image: Option<&str>, lazy: Option<&str>) -> RawItem {
        RawItem {
            title: Some(title.to_string()),
            link: Some(link.to_string()),
            image: image.map(str::to_string),
            image_lazy: lazy.map(str::to_string),
        }
    }

    #[test]
    fn ordinal_parsed_from_query() {
        assert_eq!(page_ordinal("https://site.to/az-list?page=7"), 7);
        assert_eq!(page_ordinal("https://site.to/az-list?sort=az&page=12"), 12);
    }

    #[test]
    fn ordinal_defaults_to_one() {
        assert_eq!(page_ordinal("https://site.to/az-list"), 1);
        assert_eq!(page_ordinal("https://site.to/az-list?page=abc"), 1);
        assert_eq!(page_ordinal("not a url"), 1);
    }

    #[test]
    fn page_key_formats_ordinal() {
        assert_eq!(page_key(1), "page-1");
        assert_eq!(page_key(42), "page-42");
    }

    #[test]
    fn record_requires_title_and_link() {
        let base = "https://site.to/az-list";
        assert!(record_from_raw(&RawItem::default(), base).is_none());

        let no_link = RawItem {
            title: Some("Naruto".into()),
            ..RawItem::default()
        };
        assert!(record_from_raw(&no_link, base).is_none());

        let blank_title = raw("   ", "/watch/naruto", None, None);
        assert!(record_from_raw(&blank_title, base).is_none());
    }

    #[test]
    fn record_trims_title_and_resolves_link() {
        let item = raw("  Naruto \n", "/watch/naruto-677", None, None);
        let record = record_from_raw(&item, "https://site.to/az-list?page=2").expect("valid record");
        assert_eq!(record.title, "Naruto");
        assert_eq!(record.link, "https://site.to/watch/naruto-677");
        assert_eq!(record.image, None);
    }

    #[test]
    fn image_falls_back_to_lazy_attribute() {
        let base = "https://site.to/az-list";

        let eager = raw("A", "/a", Some("https://cdn.to/a.jpg"), Some("ignored"));
        assert_eq!(
            record_from_raw(&eager, base).expect("record").image.as_deref(),
            Some("https://cdn.to/a.jpg")
        );

        let lazy = raw("B", "/b", Some(""), Some("https://cdn.to/b.jpg"));
        assert_eq!(
            record_from_raw(&lazy, base).expect("record").image.as_deref(),
            Some("https://cdn.to/b.jpg")
        );

        let neither = raw("C", "/c", Some(""), None);
        assert_eq!(record_from_raw(&neither, base).expect("record").image, None);
    }
}
