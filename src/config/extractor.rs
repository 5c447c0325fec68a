// src/config/extractor.rs
//! Configuration for the `article-extractor` binary.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::env_override;

pub const ENV_CONFIG_PATH: &str = "ARTICLE_EXTRACTOR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/extractor.toml";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// German subscription prompts that indicate truncated content.
pub const DEFAULT_PAYWALL_MARKERS: &[&str] = &[
    "Abonnieren",
    "Premium",
    "Jetzt lesen",
    "FAZ+",
    "E-Paper",
    "Weiterlesen nur mit Abo",
    "Login erforderlich",
    "exklusiv für Abonnenten",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub bind: String,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub paywall_markers: Vec<String>,
    pub browser: BrowserCfg,
    pub site_rules: Vec<SiteRuleCfg>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8084".into(),
            fetch_timeout_secs: 20,
            user_agent: DEFAULT_USER_AGENT.into(),
            paywall_markers: DEFAULT_PAYWALL_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            browser: BrowserCfg::default(),
            site_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserCfg {
    /// Base URL of the rendering service; empty disables the bypass strategy.
    pub endpoint: String,
    /// Extension directory as seen by the browser process.
    pub extension_dir: String,
    /// Hosts (suffix match) routed through the browser; empty means all.
    pub domains: Vec<String>,
    pub render_timeout_secs: u64,
    /// Remote location of the bypass ruleset; empty disables self-update.
    pub ruleset_url: String,
    /// Local copy of the ruleset, shared with the browser's extension dir.
    pub ruleset_path: PathBuf,
    pub ruleset_refresh_secs: u64,
}

impl Default for BrowserCfg {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            extension_dir: "/extensions/bypass-paywalls".into(),
            domains: Vec::new(),
            render_timeout_secs: 60,
            ruleset_url: String::new(),
            ruleset_path: PathBuf::from("/extensions/bypass-paywalls/sites.js"),
            ruleset_refresh_secs: 24 * 3600,
        }
    }
}

impl BrowserCfg {
    pub fn enabled(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs.max(1))
    }

    pub fn ruleset_refresh(&self) -> Duration {
        Duration::from_secs(self.ruleset_refresh_secs.max(60))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteRuleCfg {
    /// Host suffix, e.g. `nw.de`.
    pub host: String,
    /// Regex over the URL path; capture group 1 is the article id.
    pub id_pattern: String,
    /// Content API URL with an `{id}` placeholder.
    pub api_url: String,
}

impl ExtractorConfig {
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg: Self = super::load_default(ENV_CONFIG_PATH, DEFAULT_CONFIG_PATH)?;
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Some(v) = env_override("BIND_ADDR") {
            self.bind = v;
        }
        if let Some(v) = env_override("BROWSER_ENDPOINT") {
            self.browser.endpoint = v;
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}
