// src/error.rs
//! Error taxonomy for the ingestion side.
//!
//! Everything here is non-fatal: the scheduler logs it at the task boundary
//! and the affected source is retried on its next tick.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Network/HTTP failure retrieving a source, a page or the extractor.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Every extraction strategy came back empty.
    #[error("extraction failed for {url}")]
    ExtractionFailed { url: String },

    /// Malformed feed XML or unexpected HTML shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// External purge store unreachable or rejecting queries.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl IngestError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
