// src/ingest/providers/mod.rs
pub mod feed;
pub mod section;

use std::sync::Arc;
use std::time::Duration;

use crate::config::extractor::DEFAULT_USER_AGENT;
use crate::config::PipelineConfig;
use crate::ingest::types::{Extractor, Source};
use crate::store::IngestionEngine;

pub use feed::FeedFetcher;
pub use section::SectionCrawler;

pub const FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a source needs besides its own config.
#[derive(Clone)]
pub struct SourceContext {
    pub engine: Arc<IngestionEngine>,
    pub extractor: Arc<dyn Extractor>,
    pub client: reqwest::Client,
    pub user_agent: String,
    pub feed_timeout: Duration,
    pub min_content_length: usize,
}

impl SourceContext {
    pub fn new(
        engine: Arc<IngestionEngine>,
        extractor: Arc<dyn Extractor>,
        client: reqwest::Client,
        min_content_length: usize,
    ) -> Self {
        Self {
            engine,
            extractor,
            client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            feed_timeout: FEED_TIMEOUT,
            min_content_length,
        }
    }
}

/// Feed sources and section crawlers, as configured.
pub struct Sources {
    pub feeds: Vec<Arc<dyn Source>>,
    pub sections: Vec<Arc<dyn Source>>,
}

pub fn build_sources(cfg: &PipelineConfig, ctx: &SourceContext) -> anyhow::Result<Sources> {
    let feeds = cfg
        .feeds
        .iter()
        .map(|f| Arc::new(FeedFetcher::new(f, ctx.clone())) as Arc<dyn Source>)
        .collect();
    let sections = cfg
        .sections
        .iter()
        .map(|s| SectionCrawler::new(s, ctx.clone()).map(|c| Arc::new(c) as Arc<dyn Source>))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Sources { feeds, sections })
}
