//! Error taxonomy for the scrape pipeline.
//!
//! Each variant maps to one failure class with a defined recovery policy:
//! session acquisition and schema problems are fatal, navigation timeouts and
//! transport errors are retryable at the resilience layer, per-item
//! extraction failures never surface here at all (they are contained inside
//! the extractor).

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline error type. Carries enough context (current page ordinal, URL,
/// failed condition) that a failed run can be resumed manually.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Browser process could not be created or configured. Fatal, never
    /// retried - there is nothing to retry against.
    #[error("failed to acquire browser session: {0}")]
    SessionAcquisition(String),

    /// A readiness predicate did not hold within the bounded wait.
    /// Retryable; if retries are exhausted this is treated as a
    /// structural/site-change failure for the run.
    #[error("navigation timed out after {waited_secs}s waiting for {condition} at {url}")]
    NavigationTimeout {
        url: String,
        condition: String,
        waited_secs: u64,
    },

    /// Expected item containers are absent after a successful navigation.
    /// Fatal: the site layout changed, stop and report rather than
    /// accumulating an empty dataset.
    #[error("page structure mismatch on page {page}: {detail}")]
    StructuralMismatch { page: u32, detail: String },

    /// The aggregate failed validation before persistence. Fatal before any
    /// write happens.
    #[error("aggregate failed schema validation: {0}")]
    SchemaViolation(String),

    /// Disk or permission failure while writing the output file. Fatal; the
    /// aggregate is still in memory and the previous output file (if any) is
    /// untouched.
    #[error("failed to persist aggregate to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CDP/transport failure talking to the browser. Retryable.
    #[error("browser error: {0}")]
    Browser(String),
}

impl ScrapeError {
    /// Whether the resilience layer may retry this error. Fatal classes
    /// short-circuit retry loops immediately.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout { .. } | Self::Browser(_)
        )
    }

    /// The page ordinal this error occurred on, when the error carries one.
    #[must_use]
    pub fn page_ordinal(&self) -> Option<u32> {
        match self {
            Self::StructuralMismatch { page, .. } => Some(*page),
            _ => None,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(err.to_string())
    }
}

/// Convenience alias used throughout the pipeline.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
