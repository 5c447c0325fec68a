// src/extract/browser.rs
//! Strategy 2: paywall bypass through a headless browser.
//!
//! The browser is a pool of one: a lazily launched session behind a single
//! async mutex. Renders are serialized; a failed render tears the session
//! down and relaunches once before the error is returned.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::extractor::BrowserCfg;
use crate::http::read_limited_bytes;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("render failed: {0}")]
    Render(String),
}

/// A live browser able to render pages.
#[async_trait]
pub trait BrowserSession: Send {
    async fn render(&mut self, url: &str) -> Result<String, BrowserError>;
}

/// Starts browser sessions (with the bypass extension loaded).
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

pub struct BrowserPool {
    launcher: Arc<dyn BrowserLauncher>,
    slot: Mutex<Option<Box<dyn BrowserSession>>>,
}

impl BrowserPool {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            slot: Mutex::new(None),
        }
    }

    /// Render `url`, holding the pool lock for the whole attempt.
    pub async fn render(&self, url: &str) -> Result<String, BrowserError> {
        let mut slot = self.slot.lock().await;
        let mut last_err = None;
        for attempt in 0..2 {
            if slot.is_none() {
                match self.launcher.launch().await {
                    Ok(s) => *slot = Some(s),
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "browser launch failed");
                        last_err = Some(e);
                        continue;
                    }
                }
            }
            let Some(session) = slot.as_mut() else {
                continue;
            };
            match session.render(url).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    tracing::warn!(%url, error = %e, attempt, "render failed, tearing down browser");
                    *slot = None;
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| BrowserError::Render("no browser session".into())))
    }

    /// Drop the current session; the next render launches a fresh one.
    pub async fn reset(&self) {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            tracing::info!("browser session reset");
        }
    }

    pub async fn is_live(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

/// Launcher for a browserless-style rendering service: `GET /json/version`
/// to probe, `POST /content` to render. The bypass extension is passed as
/// launch arguments so every session starts with it loaded.
pub struct RemoteBrowserLauncher {
    client: reqwest::Client,
    endpoint: String,
    launch_param: String,
    timeout: Duration,
}

impl RemoteBrowserLauncher {
    pub fn new(client: reqwest::Client, cfg: &BrowserCfg) -> Self {
        let ext = cfg.extension_dir.trim();
        let launch = serde_json::json!({
            "headless": "new",
            "args": [
                format!("--disable-extensions-except={ext}"),
                format!("--load-extension={ext}"),
            ],
        });
        let launch_param: String =
            url::form_urlencoded::byte_serialize(launch.to_string().as_bytes()).collect();
        Self {
            client,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            launch_param,
            timeout: cfg.render_timeout(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for RemoteBrowserLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let probe = format!("{}/json/version", self.endpoint);
        let resp = self
            .client
            .get(&probe)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BrowserError::Launch(format!("HTTP {}", resp.status().as_u16())));
        }
        tracing::info!(endpoint = %self.endpoint, "browser session started");
        Ok(Box::new(RemoteSession {
            client: self.client.clone(),
            content_url: format!("{}/content?launch={}", self.endpoint, self.launch_param),
            timeout: self.timeout,
        }))
    }
}

struct RemoteSession {
    client: reqwest::Client,
    content_url: String,
    timeout: Duration,
}

#[async_trait]
impl BrowserSession for RemoteSession {
    async fn render(&mut self, url: &str) -> Result<String, BrowserError> {
        let body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": "networkidle2",
                "timeout": self.timeout.as_millis() as u64,
            },
        });
        let resp = self
            .client
            .post(&self.content_url)
            .json(&body)
            .timeout(self.timeout + Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| BrowserError::Render(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BrowserError::Render(format!("HTTP {}", resp.status().as_u16())));
        }
        let bytes = read_limited_bytes(resp, crate::http::MAX_PAGE_SIZE)
            .await
            .map_err(BrowserError::Render)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Keeps the bypass ruleset current. The size of the installed file is the
/// change fingerprint.
pub struct RulesetUpdater {
    client: reqwest::Client,
    source_url: String,
    path: PathBuf,
}

impl RulesetUpdater {
    pub fn new(client: reqwest::Client, source_url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            source_url: source_url.into(),
            path: path.into(),
        }
    }

    /// Download and install the ruleset. Returns whether its size changed.
    pub async fn refresh(&self) -> anyhow::Result<bool> {
        use anyhow::Context;

        let before = tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        let resp = self
            .client
            .get(&self.source_url)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .context("ruleset download")?
            .error_for_status()
            .context("ruleset download status")?;
        let bytes = resp.bytes().await.context("ruleset body")?;

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.ok();
        }
        tokio::fs::write(&self.path, &bytes)
            .await
            .with_context(|| format!("writing ruleset to {}", self.path.display()))?;

        let after = bytes.len() as u64;
        tracing::info!(before, after, path = %self.path.display(), "bypass ruleset refreshed");
        Ok(before != after)
    }
}

/// Refresh the ruleset now and then every `period`; a changed ruleset
/// resets the shared browser so the next render picks it up.
pub fn spawn_ruleset_refresh(
    updater: RulesetUpdater,
    pool: Arc<BrowserPool>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match updater.refresh().await {
                Ok(true) => pool.reset().await,
                Ok(false) => {}
                Err(e) => tracing::warn!(error = ?e, "bypass ruleset refresh failed"),
            }
            tokio::time::sleep(period).await;
        }
    })
}
