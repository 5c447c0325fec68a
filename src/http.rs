// src/http.rs
//! Outbound HTTP helpers shared by the fetchers and the extractors.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;

use crate::error::IngestError;

pub const MAX_PAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// GET a URL as text with browser-like headers, a timeout and a size cap.
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    user_agent: &str,
    timeout: Duration,
) -> Result<String, IngestError> {
    let bytes = fetch_bytes(client, url, user_agent, timeout).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Raw body variant of [`fetch_text`]; feeds keep their declared encoding.
pub async fn fetch_bytes(
    client: &reqwest::Client,
    url: &str,
    user_agent: &str,
    timeout: Duration,
) -> Result<Vec<u8>, IngestError> {
    let response = client
        .get(url)
        .header(USER_AGENT, user_agent)
        .header(
            ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header(ACCEPT_LANGUAGE, "de-DE,de;q=0.9,en;q=0.8")
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| IngestError::fetch(url, e))?;

    if !response.status().is_success() {
        return Err(IngestError::fetch(
            url,
            format!("HTTP {}", response.status().as_u16()),
        ));
    }

    read_limited_bytes(response, MAX_PAGE_SIZE)
        .await
        .map_err(|reason| IngestError::fetch(url, reason))
}

/// Read a response body, refusing anything over `limit` bytes.
pub async fn read_limited_bytes(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, String> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(format!("response too large ({len} bytes)"));
        }
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(format!("response exceeds {limit} bytes"));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
