//! Top-level pipeline driver
//!
//! Wires the stages together in the canonical order: session acquisition,
//! initial navigation, the pagination loop, validation and persistence, then
//! session teardown. Teardown runs on every exit path, whichever stage
//! failed - an unreleased session leaks an OS process, which is a
//! correctness bug, not a tuning concern.

use tracing::{error, info, warn};

use crate::browser::{self, BrowserSession};
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::navigation::{self, Readiness};
use crate::pagination::PaginationEngine;
use crate::persistence;
use crate::resilience::with_retry;
use crate::store::{DedupStore, IdentityKey};
use crate::surface::CatalogSurface;

/// Run one complete scrape: traverse the paginated listing and atomically
/// persist the aggregate to the configured output path.
///
/// # Errors
///
/// The first fatal error of any stage, after session teardown has been
/// attempted. Which stage failed and on which page is logged with the error.
pub async fn run(config: ScrapeConfig) -> ScrapeResult<()> {
    let session = BrowserSession::acquire(&config).await?;
    info!("Browser session acquired");

    let result = run_with_session(&config, &session).await;

    // Release the session regardless of how the run went. A teardown error
    // must not mask the run's own failure.
    match session.close().await {
        Ok(()) => info!("Browser session released"),
        Err(e) => warn!("Session teardown reported an error: {e}"),
    }

    if let Err(e) = &result {
        match e.page_ordinal() {
            Some(page) => error!("Scrape failed on page {page}: {e}"),
            None => error!("Scrape failed: {e}"),
        }
    }
    result
}

async fn run_with_session(config: &ScrapeConfig, session: &BrowserSession) -> ScrapeResult<()> {
    let page = session.new_page().await?;

    if let Err(e) = browser::suppress_automation_signals(&page).await {
        // Reduced stealth is survivable; a failed run is not.
        warn!("Could not suppress automation signals: {e}");
    }

    // Touch the site root first and prove the listing entry exists - a
    // liveness check on the whole site before the catalog walk starts.
    // Retried like any other navigation.
    let listing_anchor = format!("a[href=\"{}\"]", config.listing_path());
    let entry_ready = Readiness::ElementInteractable(listing_anchor);
    with_retry(
        "site entry navigation",
        config.max_attempts(),
        config.retry_delay(),
        async || {
            navigation::goto_and_wait(
                &page,
                config.base_url(),
                &entry_ready,
                config.wait_timeout(),
                config.poll_interval(),
            )
            .await
        },
    )
    .await?;

    let mut surface = CatalogSurface::new(session.browser(), page, config);

    let listing_url = config
        .listing_url()
        .map_err(|e| ScrapeError::Browser(format!("cannot resolve listing URL: {e}")))?;

    let identity = if config.dedup_by_link() {
        IdentityKey::Link
    } else {
        IdentityKey::Title
    };
    let mut store = DedupStore::new(identity);

    let engine = PaginationEngine::new(config);

    // Enter the listing by resolved URL rather than clicking the anchor;
    // a URL transition cannot be intercepted by an overlay.
    engine.open(&mut surface, listing_url.as_str()).await?;

    let pages = engine.run(&mut surface, &mut store).await?;
    info!("Pagination finished after {pages} pages");

    let aggregate = store.into_aggregate();
    persistence::save(&aggregate, config.output_path()).await?;

    info!(
        "Scrape complete: {} records across {} pages -> {}",
        aggregate.total_records(),
        aggregate.page_count(),
        config.output_path().display()
    );
    Ok(())
}
