// src/ingest/providers/feed.rs
use async_trait::async_trait;
use metrics::counter;

use super::SourceContext;
use crate::config::pipeline::FeedSourceCfg;
use crate::error::IngestError;
use crate::http::fetch_bytes;
use crate::ingest::parser::{parse_feed, ParsedItem};
use crate::ingest::types::{Candidate, Source};
use crate::text::{char_len, strip_markup};

/// Polls one RSS/Atom feed.
pub struct FeedFetcher {
    tag: String,
    url: String,
    extract: bool,
    ctx: SourceContext,
}

impl FeedFetcher {
    pub fn new(cfg: &FeedSourceCfg, ctx: SourceContext) -> Self {
        Self {
            tag: cfg.tag.clone(),
            url: cfg.url.clone(),
            extract: cfg.extract,
            ctx,
        }
    }

    /// Fetch and parse the feed; items without a link are dropped.
    pub async fn candidates(&self) -> Result<Vec<Candidate>, IngestError> {
        let bytes = fetch_bytes(
            &self.ctx.client,
            &self.url,
            &self.ctx.user_agent,
            self.ctx.feed_timeout,
        )
        .await?;
        let items = parse_feed(&bytes)?;
        Ok(items.into_iter().filter_map(to_candidate).collect())
    }

    /// Body for a candidate, or `None` when the item has to wait for a later tick.
    async fn resolve(&self, c: &Candidate) -> Option<(String, String)> {
        let title = c.title.clone().unwrap_or_default();
        let teaser = c.content.as_deref().map(strip_markup).unwrap_or_default();

        if !self.extract {
            return Some((title, teaser));
        }
        if char_len(&teaser) >= self.ctx.min_content_length {
            tracing::debug!(source = %self.tag, url = %c.url, "feed body long enough, skipping extractor");
            return Some((title, teaser));
        }

        match self.ctx.extractor.extract(&c.url).await {
            Ok(r) => {
                let title = if title.is_empty() { r.title } else { title };
                Some((title, r.content))
            }
            Err(e) => {
                counter!("ingest_extract_failures_total").increment(1);
                tracing::warn!(source = %self.tag, url = %c.url, error = %e, "extraction failed, will retry");
                None
            }
        }
    }
}

fn to_candidate(it: ParsedItem) -> Option<Candidate> {
    let url = it.link.trim().to_string();
    if url.is_empty() {
        return None;
    }
    Some(Candidate {
        url,
        title: Some(it.title).filter(|t| !t.is_empty()),
        content: it.summary,
        published: it.published,
    })
}

#[async_trait]
impl Source for FeedFetcher {
    async fn ingest(&self) -> Result<usize, IngestError> {
        let candidates = self.candidates().await.inspect_err(|e| {
            counter!("ingest_source_errors_total", "source" => self.tag.clone()).increment(1);
            tracing::warn!(source = %self.tag, error = %e, "feed fetch failed");
        })?;

        let mut added = 0;
        for c in candidates {
            if self.ctx.engine.is_seen(&c.url) {
                continue;
            }
            let Some((title, content)) = self.resolve(&c).await else {
                continue;
            };
            if self
                .ctx
                .engine
                .add_item(&title, &c.url, &content, &self.tag, c.published.as_deref())
            {
                added += 1;
            }
        }
        tracing::info!(source = %self.tag, added, "feed polled");
        Ok(added)
    }

    fn tag(&self) -> &str {
        &self.tag
    }
}
