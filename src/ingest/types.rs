// src/ingest/types.rs
use async_trait::async_trait;

use crate::error::IngestError;
use crate::extract::ExtractionResult;

/// Candidate produced by a source fetcher before dedup and extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<String>,
}

/// Full-text extraction as seen from the ingestion side.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, IngestError>;

    /// Readiness probe used before the seeding pass.
    async fn ready(&self) -> bool;
}

/// One ingestion source (a feed or a crawled site).
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch, dedup, extract and insert. Returns the number of new items.
    async fn ingest(&self) -> Result<usize, IngestError>;

    fn tag(&self) -> &str;
}
