// src/config/pipeline.rs
//! Configuration for the `news-pipeline` binary.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::env_override;
use crate::store::{DEFAULT_FEED_MAX, DEFAULT_SEEN_MAX};

pub const ENV_CONFIG_PATH: &str = "NEWS_PIPELINE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

pub const DEFAULT_NW_LINK_PATTERN: &str = r"^https?://www\.nw\.de/lokal/.+\.html$";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub server: ServerCfg,
    pub extractor: ExtractorClientCfg,
    pub intervals: IntervalsCfg,
    pub limits: LimitsCfg,
    pub purge: PurgeCfg,
    pub feeds: Vec<FeedSourceCfg>,
    pub sections: Vec<SectionSourceCfg>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerCfg {
    pub bind: String,
    pub title: String,
    pub link: String,
    pub description: String,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8093".into(),
            title: "News Pipeline".into(),
            link: "http://localhost:8093/".into(),
            description: "Aggregated full-text news".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorClientCfg {
    pub url: String,
    pub timeout_secs: u64,
    pub ready_attempts: u32,
    pub ready_delay_secs: u64,
}

impl Default for ExtractorClientCfg {
    fn default() -> Self {
        Self {
            url: "http://article-extractor:8084".into(),
            timeout_secs: 90,
            ready_attempts: 30,
            ready_delay_secs: 2,
        }
    }
}

impl ExtractorClientCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn ready_delay(&self) -> Duration {
        Duration::from_secs(self.ready_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntervalsCfg {
    pub feeds_secs: u64,
    pub sections_secs: u64,
    pub purge_secs: u64,
    pub seen_sweep_secs: u64,
}

impl Default for IntervalsCfg {
    fn default() -> Self {
        Self {
            feeds_secs: 900,
            sections_secs: 900,
            purge_secs: 24 * 3600,
            seen_sweep_secs: 3600,
        }
    }
}

impl IntervalsCfg {
    pub fn feeds(&self) -> Duration {
        Duration::from_secs(self.feeds_secs.max(1))
    }
    pub fn sections(&self) -> Duration {
        Duration::from_secs(self.sections_secs.max(1))
    }
    pub fn purge(&self) -> Duration {
        Duration::from_secs(self.purge_secs.max(1))
    }
    pub fn seen_sweep(&self) -> Duration {
        Duration::from_secs(self.seen_sweep_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsCfg {
    pub feed_max: usize,
    pub seen_max: usize,
    /// Feed descriptions at least this long are used as-is even when
    /// extraction is enabled for the source.
    pub min_content_length: usize,
}

impl Default for LimitsCfg {
    fn default() -> Self {
        Self {
            feed_max: DEFAULT_FEED_MAX,
            seen_max: DEFAULT_SEEN_MAX,
            min_content_length: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PurgeCfg {
    /// Postgres connection string of the store to purge; empty disables purging.
    pub database_url: String,
    pub read_days: u32,
    pub unread_days: u32,
}

impl Default for PurgeCfg {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            read_days: 30,
            unread_days: 90,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSourceCfg {
    pub tag: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub extract: bool,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionSourceCfg {
    pub tag: String,
    pub urls: Vec<String>,
    #[serde(default = "default_link_pattern")]
    pub link_pattern: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_max_new")]
    pub max_new_per_run: usize,
}

fn default_true() -> bool {
    true
}

fn default_link_pattern() -> String {
    DEFAULT_NW_LINK_PATTERN.to_string()
}

fn default_max_new() -> usize {
    50
}

impl PipelineConfig {
    /// `$NEWS_PIPELINE_CONFIG`, then `config/pipeline.toml`, then defaults;
    /// environment overrides applied last.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg: Self = super::load_default(ENV_CONFIG_PATH, DEFAULT_CONFIG_PATH)?;
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Some(v) = env_override("BIND_ADDR") {
            self.server.bind = v;
        }
        if let Some(v) = env_override("EXTRACTOR_URL") {
            self.extractor.url = v;
        }
        if let Some(v) = env_override("PURGE_DATABASE_URL") {
            self.purge.database_url = v;
        }
    }

    /// Category name (lowercase) to the source tags it groups.
    pub fn categories(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let pairs = self
            .feeds
            .iter()
            .map(|f| (&f.category, &f.tag))
            .chain(self.sections.iter().map(|s| (&s.category, &s.tag)));
        for (cat, tag) in pairs {
            let Some(cat) = cat.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
                continue;
            };
            let tags = map.entry(cat.to_ascii_lowercase()).or_default();
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.clone());
            }
        }
        map
    }

    /// Every configured source tag, in config order, without duplicates.
    pub fn source_tags(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for tag in self
            .feeds
            .iter()
            .map(|f| &f.tag)
            .chain(self.sections.iter().map(|s| &s.tag))
        {
            if !out.contains(tag) {
                out.push(tag.clone());
            }
        }
        out
    }
}
