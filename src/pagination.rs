//! Pagination state machine
//!
//! Repeatedly extracts the current page then navigates to the next until no
//! further page exists. The only valid termination is the next control being
//! absent, disabled, or without a usable target: a fixed iteration count
//! would silently truncate large catalogs, and looping without the check
//! risks running forever.
//!
//! Transitions navigate by resolved target URL, never by simulated click -
//! URL transitions are immune to overlay interception and element-staleness
//! races.

use log::{error, info};
use std::time::Duration;

use crate::config::ScrapeConfig;
use crate::error::ScrapeResult;
use crate::extractor;
use crate::resilience::with_retry;
use crate::store::DedupStore;
use crate::surface::ListingSurface;

/// Engine states. `NavigatingToNext` carries the resolved target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    ExtractingCurrentPage,
    LookingForNext,
    NavigatingToNext(String),
    Terminated,
}

/// Drives the extract/navigate loop over a [`ListingSurface`].
pub struct PaginationEngine {
    max_attempts: u32,
    retry_delay: Duration,
}

impl PaginationEngine {
    #[must_use]
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            max_attempts: config.max_attempts(),
            retry_delay: config.retry_delay(),
        }
    }

    /// Navigate `surface` to `url` under the configured retry budget.
    ///
    /// The surface settles inside every attempt, so pacing and anomaly
    /// resolution precede each navigation, not just the first.
    pub async fn open<S: ListingSurface>(&self, surface: &mut S, url: &str) -> ScrapeResult<()> {
        with_retry(
            "listing navigation",
            self.max_attempts,
            self.retry_delay,
            async || {
                surface.settle().await;
                surface.open(url).await
            },
        )
        .await
    }

    /// Run the state machine to termination, merging every accepted record
    /// into `store`. Returns the number of pages visited.
    ///
    /// Extraction and navigation are individually retry-wrapped; the loop as
    /// a whole is not, so completed pages are never re-run.
    pub async fn run<S: ListingSurface>(
        &self,
        surface: &mut S,
        store: &mut DedupStore,
    ) -> ScrapeResult<u32> {
        let mut state = EngineState::ExtractingCurrentPage;
        let mut pages_visited = 0u32;
        let mut current_ordinal = 1u32;

        loop {
            state = match state {
                EngineState::ExtractingCurrentPage => {
                    let page = with_retry(
                        "listing page extraction",
                        self.max_attempts,
                        self.retry_delay,
                        async || extractor::extract_page(&*surface).await,
                    )
                    .await
                    .inspect_err(|e| {
                        error!("Extraction failed on page {current_ordinal}: {e}");
                    })?;

                    current_ordinal = page.ordinal;
                    pages_visited += 1;

                    let total = page.records.len();
                    let mut accepted = 0usize;
                    for record in page.records {
                        if store.insert(page.ordinal, record) {
                            accepted += 1;
                        }
                    }
                    info!(
                        "Page {current_ordinal}: accepted {accepted}/{total} records \
                         ({} total so far)",
                        store.aggregate().total_records()
                    );

                    EngineState::LookingForNext
                }

                EngineState::LookingForNext => match surface.next_page_url().await? {
                    Some(url) => EngineState::NavigatingToNext(url),
                    None => {
                        info!("No further page after page {current_ordinal}, terminating");
                        EngineState::Terminated
                    }
                },

                EngineState::NavigatingToNext(url) => {
                    self.open(surface, &url).await.inspect_err(|e| {
                        error!(
                            "Navigation to next page failed after page {current_ordinal}: {e}"
                        );
                    })?;
                    EngineState::ExtractingCurrentPage
                }

                EngineState::Terminated => break,
            };
        }

        Ok(pages_visited)
    }
}
