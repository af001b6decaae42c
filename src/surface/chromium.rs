//! Chromium-backed listing surface
//!
//! Production [`ListingSurface`] implementation over a live
//! `chromiumoxide::Page`. Element queries go through CDP with the configured
//! selectors; per-container failures degrade that one item instead of
//! failing the page.

use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::element::Element;
use log::{debug, trace, warn};
use url::Url;

use super::{ListingSurface, RawItem};
use crate::behavior;
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::navigation::{self, Readiness};

/// A catalog listing loaded in a Chromium tab.
pub struct CatalogSurface<'a> {
    browser: &'a Browser,
    page: Page,
    config: &'a ScrapeConfig,
}

impl<'a> CatalogSurface<'a> {
    /// Wrap an already-navigated page. The page is canonical for anomaly
    /// resolution: any other target the site opens gets closed.
    #[must_use]
    pub fn new(browser: &'a Browser, page: Page, config: &'a ScrapeConfig) -> Self {
        Self {
            browser,
            page,
            config,
        }
    }

    async fn item_from_container(&self, container: &Element) -> ScrapeResult<RawItem> {
        let selectors = self.config.selectors();
        let mut item = RawItem::default();

        match container.find_element(selectors.title_link()).await {
            Ok(title_el) => {
                item.title = title_el.inner_text().await?;
                item.link = title_el.attribute("href").await?;
            }
            Err(e) => trace!("Title link missing in container: {e}"),
        }

        match container.find_element(selectors.poster_image()).await {
            Ok(img_el) => {
                item.image = img_el.attribute("src").await?;
                item.image_lazy = img_el.attribute(selectors.lazy_image_attr()).await?;
            }
            Err(e) => trace!("Poster image missing in container: {e}"),
        }

        Ok(item)
    }
}

impl ListingSurface for CatalogSurface<'_> {
    async fn current_url(&self) -> ScrapeResult<String> {
        let url = self.page.url().await?;
        url.ok_or_else(|| ScrapeError::Browser("page has no URL".to_string()))
    }

    async fn raw_items(&self) -> ScrapeResult<Vec<RawItem>> {
        let selectors = self.config.selectors();
        let containers = self
            .page
            .find_elements(selectors.item_container())
            .await
            .map_err(|e| {
                ScrapeError::Browser(format!(
                    "failed to query item containers '{}': {e}",
                    selectors.item_container()
                ))
            })?;

        let mut items = Vec::with_capacity(containers.len());
        for (index, container) in containers.iter().enumerate() {
            match self.item_from_container(container).await {
                Ok(item) => items.push(item),
                Err(e) => {
                    // One bad container never aborts the page; the extractor
                    // drops the empty item.
                    debug!("Container {index} unreadable, skipping: {e}");
                    items.push(RawItem::default());
                }
            }
        }

        Ok(items)
    }

    async fn next_page_url(&self) -> ScrapeResult<Option<String>> {
        let selectors = self.config.selectors();

        // The selector excludes the disabled state, so an exhausted pager
        // resolves to no element here.
        let next = match self.page.find_element(selectors.next_control()).await {
            Ok(el) => el,
            Err(_) => {
                debug!("No enabled next control, pagination exhausted");
                return Ok(None);
            }
        };

        let href = match next.attribute("href").await {
            Ok(Some(href)) if !href.trim().is_empty() => href,
            Ok(_) => {
                debug!("Next control has no usable href");
                return Ok(None);
            }
            Err(e) => {
                warn!("Failed to read next control href: {e}");
                return Ok(None);
            }
        };

        // CDP returns the raw attribute value; resolve it against the
        // current document URL.
        let current = self.current_url().await?;
        let base = Url::parse(&current)
            .map_err(|e| ScrapeError::Browser(format!("unparseable current URL '{current}': {e}")))?;
        let absolute = base
            .join(&href)
            .map_err(|e| ScrapeError::Browser(format!("unresolvable next href '{href}': {e}")))?;

        Ok(Some(absolute.to_string()))
    }

    async fn open(&mut self, url: &str) -> ScrapeResult<()> {
        let readiness = Readiness::ItemsPresent(self.config.selectors().item_container().to_string());
        navigation::goto_and_wait(
            &self.page,
            url,
            &readiness,
            self.config.wait_timeout(),
            self.config.poll_interval(),
        )
        .await
    }

    async fn settle(&mut self) {
        let (min_ms, max_ms) = self.config.pace_bounds_ms();
        behavior::pace(min_ms, max_ms).await;
        behavior::resolve_anomalies(
            self.browser,
            &self.page,
            self.config.selectors().overlay_close(),
        )
        .await;
    }
}
