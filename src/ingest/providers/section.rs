// src/ingest/providers/section.rs
//! Crawls section listing pages of a site without a usable feed.

use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use super::SourceContext;
use crate::config::pipeline::SectionSourceCfg;
use crate::error::IngestError;
use crate::http::fetch_text;
use crate::ingest::types::Source;
use crate::store::now_rfc2822;
use crate::text::title_from_slug;

pub struct SectionCrawler {
    tag: String,
    pages: Vec<String>,
    link_pattern: Regex,
    max_new_per_run: usize,
    ctx: SourceContext,
}

impl SectionCrawler {
    pub fn new(cfg: &SectionSourceCfg, ctx: SourceContext) -> anyhow::Result<Self> {
        let link_pattern = Regex::new(&cfg.link_pattern)
            .map_err(|e| anyhow::anyhow!("section {}: bad link_pattern: {e}", cfg.tag))?;
        Ok(Self {
            tag: cfg.tag.clone(),
            pages: cfg.urls.clone(),
            link_pattern,
            max_new_per_run: cfg.max_new_per_run,
            ctx,
        })
    }

    /// Article links on one listing page, in document order.
    pub async fn links(&self, page: &str) -> Result<Vec<String>, IngestError> {
        let html = fetch_text(
            &self.ctx.client,
            page,
            &self.ctx.user_agent,
            self.ctx.feed_timeout,
        )
        .await?;
        let base = Url::parse(page).map_err(|e| IngestError::Parse(format!("{page}: {e}")))?;
        Ok(collect_links(&html, &base, &self.link_pattern))
    }
}

fn anchor_selector() -> &'static Selector {
    static SEL: OnceCell<Selector> = OnceCell::new();
    SEL.get_or_init(|| Selector::parse("a[href]").expect("static selector"))
}

/// Resolve every `a[href]` against `base`, keep pattern matches, dedup in order.
pub fn collect_links(html: &str, base: &Url, pattern: &Regex) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for a in doc.select(anchor_selector()) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let Ok(mut abs) = base.join(href.trim()) else {
            continue;
        };
        abs.set_fragment(None);
        let abs = abs.to_string();
        if pattern.is_match(&abs) && seen.insert(abs.clone()) {
            out.push(abs);
        }
    }
    out
}

#[async_trait]
impl Source for SectionCrawler {
    async fn ingest(&self) -> Result<usize, IngestError> {
        let mut added = 0;
        let mut attempted = 0;
        let mut last_err = None;
        let mut pages_ok = 0;

        'pages: for page in &self.pages {
            let links = match self.links(page).await {
                Ok(l) => l,
                Err(e) => {
                    counter!("ingest_source_errors_total", "source" => self.tag.clone()).increment(1);
                    tracing::warn!(source = %self.tag, page = %page, error = %e, "section fetch failed");
                    last_err = Some(e);
                    continue;
                }
            };
            pages_ok += 1;

            for url in links {
                if self.ctx.engine.is_seen(&url) {
                    continue;
                }
                if attempted >= self.max_new_per_run {
                    tracing::info!(source = %self.tag, cap = self.max_new_per_run, "per-run cap reached");
                    break 'pages;
                }
                attempted += 1;

                let r = match self.ctx.extractor.extract(&url).await {
                    Ok(r) => r,
                    Err(e) => {
                        counter!("ingest_extract_failures_total").increment(1);
                        tracing::warn!(source = %self.tag, url = %url, error = %e, "extraction failed, will retry");
                        continue;
                    }
                };
                let title = if r.title.trim().is_empty() {
                    title_from_slug(&url).unwrap_or_default()
                } else {
                    r.title
                };
                let discovered = now_rfc2822();
                if self
                    .ctx
                    .engine
                    .add_item(&title, &url, &r.content, &self.tag, Some(&discovered))
                {
                    added += 1;
                }
            }
        }

        match last_err {
            Some(e) if pages_ok == 0 => Err(e),
            _ => {
                tracing::info!(source = %self.tag, added, "sections crawled");
                Ok(added)
            }
        }
    }

    fn tag(&self) -> &str {
        &self.tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::pipeline::DEFAULT_NW_LINK_PATTERN;

    #[test]
    fn resolves_filters_and_dedups_links() {
        let html = r##"
            <a href="/lokal/bielefeld/12345_Rathaus-saniert.html">A</a>
            <a href="https://www.nw.de/lokal/guetersloh/222_Neue-Bruecke.html#comments">B</a>
            <a href="/lokal/bielefeld/12345_Rathaus-saniert.html">A again</a>
            <a href="/sport/333_Spiel.html">sport</a>
            <a href="mailto:redaktion@nw.de">mail</a>
        "##;
        let base = Url::parse("https://www.nw.de/lokal/bielefeld/").unwrap();
        let re = Regex::new(DEFAULT_NW_LINK_PATTERN).unwrap();
        assert_eq!(
            collect_links(html, &base, &re),
            vec![
                "https://www.nw.de/lokal/bielefeld/12345_Rathaus-saniert.html".to_string(),
                "https://www.nw.de/lokal/guetersloh/222_Neue-Bruecke.html".to_string(),
            ]
        );
    }
}
