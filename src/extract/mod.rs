// src/extract/mod.rs
//! Extraction cascade: URL in, clean article text out.
//!
//! Strategies in priority order:
//! 1. site content API (when a rule matches the URL)
//! 2. headless-browser render with the paywall-bypass extension
//! 3. readability over the directly fetched page
//! 4. paragraph-density extraction, when 2/3 found nothing or hit a paywall
//!
//! A paywalled site-API answer is compared against strategies 2-4 the same
//! way a paywalled page result is compared against strategy 4.
pub mod browser;
pub mod paragraphs;
pub mod paywall;
pub mod readability;
pub mod server;
pub mod site_api;

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ExtractorConfig;
use crate::error::IngestError;
use crate::http::fetch_text;
use crate::text::char_len;
use browser::BrowserPool;
use paywall::PaywallDetector;
use site_api::{host_matches, SiteRule};

/// Title and text produced by one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extracted {
    pub title: String,
    pub content: String,
}

/// Which strategy produced a result. Serialized with the wire names the
/// extractor service has always reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "site-api")]
    SiteApi,
    #[serde(rename = "chromium-bypass")]
    ChromiumBypass,
    #[serde(rename = "trafilatura")]
    Readability,
    #[serde(rename = "newspaper-fallback")]
    ParagraphFallback,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::SiteApi => "site-api",
            Method::ChromiumBypass => "chromium-bypass",
            Method::Readability => "trafilatura",
            Method::ParagraphFallback => "newspaper-fallback",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "site-api" => Some(Method::SiteApi),
            "chromium-bypass" => Some(Method::ChromiumBypass),
            "trafilatura" => Some(Method::Readability),
            "newspaper-fallback" | "newspaper3k" => Some(Method::ParagraphFallback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub title: String,
    pub content: String,
    pub method: Method,
    pub paywalled: bool,
}

impl ExtractionResult {
    pub fn new(e: Extracted, method: Method, paywalled: bool) -> Self {
        Self {
            title: e.title,
            content: e.content,
            method,
            paywalled,
        }
    }
}

/// Fallback wins only when it recovered strictly more text than the primary.
pub fn choose(primary: ExtractionResult, fallback: Option<ExtractionResult>) -> ExtractionResult {
    match fallback {
        Some(fb) if char_len(&fb.content) > char_len(&primary.content) => fb,
        _ => primary,
    }
}

pub struct Cascade {
    client: reqwest::Client,
    user_agent: String,
    fetch_timeout: Duration,
    paywall: PaywallDetector,
    site_rules: Vec<SiteRule>,
    browser: Option<Arc<BrowserPool>>,
    browser_domains: Vec<String>,
}

impl Cascade {
    pub fn new(client: reqwest::Client, cfg: &ExtractorConfig) -> anyhow::Result<Self> {
        let site_rules = cfg
            .site_rules
            .iter()
            .map(SiteRule::from_cfg)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            client,
            user_agent: cfg.user_agent.clone(),
            fetch_timeout: cfg.fetch_timeout(),
            paywall: PaywallDetector::new(&cfg.paywall_markers),
            site_rules,
            browser: None,
            browser_domains: cfg
                .browser
                .domains
                .iter()
                .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        })
    }

    pub fn with_browser(mut self, pool: Arc<BrowserPool>) -> Self {
        self.browser = Some(pool);
        self
    }

    fn browser_applies(&self, url: &str) -> bool {
        if self.browser.is_none() {
            return false;
        }
        if self.browser_domains.is_empty() {
            return true;
        }
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|h| self.browser_domains.iter().any(|d| host_matches(&h, d)))
    }

    pub async fn extract(&self, url: &str) -> Result<ExtractionResult, IngestError> {
        let result = self.run(url).await;
        match &result {
            Ok(r) => {
                counter!("extract_requests_total", "method" => r.method.as_str()).increment(1);
                tracing::info!(%url, method = r.method.as_str(), paywalled = r.paywalled, chars = char_len(&r.content), "extracted");
            }
            Err(_) => {
                counter!("extract_requests_total", "method" => "failed").increment(1);
                tracing::info!(%url, "extraction failed");
            }
        }
        result
    }

    async fn run(&self, url: &str) -> Result<ExtractionResult, IngestError> {
        // 1) site API; a paywalled answer only sets the bar for the page strategies
        if let Some(e) = site_api::extract(&self.client, &self.site_rules, url, self.fetch_timeout).await {
            if !self.paywall.is_paywalled(&e.content) {
                return Ok(ExtractionResult::new(e, Method::SiteApi, false));
            }
            tracing::info!(%url, "site API result is paywalled, trying the page");
            let api = ExtractionResult::new(e, Method::SiteApi, true);
            let mut best = choose(api, self.from_page(url).await.ok());
            best.paywalled = true;
            return Ok(best);
        }
        self.from_page(url).await
    }

    /// Strategies 2 to 4, all working on the article page itself.
    async fn from_page(&self, url: &str) -> Result<ExtractionResult, IngestError> {
        // 2) browser bypass
        let mut rendered: Option<String> = None;
        let mut primary: Option<ExtractionResult> = None;
        if self.browser_applies(url) {
            if let Some(pool) = &self.browser {
                match pool.render(url).await {
                    Ok(html) => {
                        primary = readability::extract(&html, Some(url))
                            .map(|e| ExtractionResult::new(e, Method::ChromiumBypass, false));
                        rendered = Some(html);
                    }
                    Err(e) => tracing::info!(%url, error = %e, "browser bypass unavailable"),
                }
            }
        }

        // 3) readability on the direct fetch
        let mut fetched: Option<String> = None;
        if primary.is_none() {
            match fetch_text(&self.client, url, &self.user_agent, self.fetch_timeout).await {
                Ok(html) => {
                    primary = readability::extract(&html, Some(url))
                        .map(|e| ExtractionResult::new(e, Method::Readability, false));
                    fetched = Some(html);
                }
                Err(e) => tracing::info!(%url, error = %e, "direct fetch failed"),
            }
        }

        // 4) paragraph fallback over whatever HTML we already hold
        let html = fetched.as_deref().or(rendered.as_deref());
        let fallback = |paywalled: bool| {
            html.and_then(paragraphs::extract)
                .filter(|e| !e.content.is_empty())
                .map(|e| ExtractionResult::new(e, Method::ParagraphFallback, paywalled))
        };

        match primary {
            Some(mut p) if self.paywall.is_paywalled(&p.content) => {
                tracing::info!(%url, "paywall detected, trying paragraph fallback");
                p.paywalled = true;
                Ok(choose(p, fallback(true)))
            }
            Some(p) => Ok(p),
            None => fallback(false).ok_or_else(|| IngestError::ExtractionFailed {
                url: url.to_string(),
            }),
        }
    }
}
