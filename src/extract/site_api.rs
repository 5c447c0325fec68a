// src/extract/site_api.rs
//! Strategy 1: a site's own content API, keyed by an article id in the URL.

use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::Extracted;
use crate::config::extractor::SiteRuleCfg;
use crate::text::{clean_title, strip_markup};

#[derive(Debug, Clone)]
pub struct SiteRule {
    host: String,
    id_pattern: Regex,
    api_url: String,
}

impl SiteRule {
    pub fn new(host: &str, id_pattern: &str, api_url: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            host: host.trim().trim_start_matches('.').to_ascii_lowercase(),
            id_pattern: Regex::new(id_pattern)?,
            api_url: api_url.to_string(),
        })
    }

    pub fn from_cfg(cfg: &SiteRuleCfg) -> Result<Self, regex::Error> {
        Self::new(&cfg.host, &cfg.id_pattern, &cfg.api_url)
    }

    /// The API URL for `url`, if this rule applies to it.
    pub fn api_url_for(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();
        if !host_matches(&host, &self.host) {
            return None;
        }
        let id = self.id_pattern.captures(parsed.path())?.get(1)?.as_str();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(self.api_url.replace("{id}", id))
    }
}

/// `www.nw.de` matches `nw.de`; `evilnw.de` does not.
pub fn host_matches(host: &str, suffix: &str) -> bool {
    host == suffix || host.ends_with(&format!(".{suffix}"))
}

/// Tolerant decode of a content-API response: every field optional,
/// unknown fields ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiArticle {
    title: Option<String>,
    headline: Option<String>,
    body: Option<String>,
    text: Option<String>,
    content: Option<String>,
}

impl ApiArticle {
    fn into_extracted(self) -> Option<Extracted> {
        let body = [self.body, self.text, self.content]
            .into_iter()
            .flatten()
            .map(|b| strip_markup(&b))
            .find(|b| !b.is_empty())?;
        let title = [self.title, self.headline]
            .into_iter()
            .flatten()
            .map(|t| clean_title(&t))
            .find(|t| !t.is_empty())
            .unwrap_or_default();
        Some(Extracted {
            title,
            content: body,
        })
    }
}

/// Try every rule in order; any failure falls through silently.
pub async fn extract(
    client: &reqwest::Client,
    rules: &[SiteRule],
    url: &str,
    timeout: Duration,
) -> Option<Extracted> {
    let api_url = rules.iter().find_map(|r| r.api_url_for(url))?;

    let resp = match client.get(&api_url).timeout(timeout).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            tracing::debug!(%api_url, status = %r.status(), "site api non-success");
            return None;
        }
        Err(e) => {
            tracing::debug!(%api_url, error = ?e, "site api request failed");
            return None;
        }
    };
    match resp.json::<ApiArticle>().await {
        Ok(article) => article.into_extracted(),
        Err(e) => {
            tracing::debug!(%api_url, error = ?e, "site api decode failed");
            None
        }
    }
}
