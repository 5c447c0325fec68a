// src/ingest/client.rs
//! HTTP client for the extractor service (`POST /extract`, `GET /health`).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::types::Extractor;
use crate::error::IngestError;
use crate::extract::{ExtractionResult, Method};

#[derive(Clone)]
pub struct HttpExtractor {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

impl HttpExtractor {
    pub fn new(client: reqwest::Client, base: &str, timeout: Duration) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

/// Tolerant view of the `/extract` response: missing fields default,
/// unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExtractResp {
    title: String,
    content: String,
    method: Option<String>,
    paywalled: bool,
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, IngestError> {
        let endpoint = format!("{}/extract", self.base);
        let resp = self
            .client
            .post(&endpoint)
            .json(&serde_json::json!({ "url": url }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| IngestError::fetch(&endpoint, e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            return Err(IngestError::ExtractionFailed {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(IngestError::fetch(&endpoint, format!("HTTP {}", status.as_u16())));
        }

        let body: ExtractResp = resp
            .json()
            .await
            .map_err(|e| IngestError::Parse(format!("extractor response: {e}")))?;
        if body.content.trim().is_empty() {
            return Err(IngestError::ExtractionFailed {
                url: url.to_string(),
            });
        }
        Ok(ExtractionResult {
            title: body.title,
            content: body.content,
            method: body
                .method
                .as_deref()
                .and_then(Method::from_wire)
                .unwrap_or(Method::Readability),
            paywalled: body.paywalled,
        })
    }

    async fn ready(&self) -> bool {
        let url = format!("{}/health", self.base);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(r) => r.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "extractor not ready");
                false
            }
        }
    }
}

/// Poll `ready()` up to `attempts` times, `delay` apart.
pub async fn wait_ready(extractor: &dyn Extractor, attempts: u32, delay: Duration) -> bool {
    for attempt in 1..=attempts.max(1) {
        if extractor.ready().await {
            tracing::info!(attempt, "extractor ready");
            return true;
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    tracing::warn!(attempts, "extractor not ready, continuing without confirmation");
    false
}
