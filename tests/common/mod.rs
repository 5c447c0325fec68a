// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use news_pipeline::extract::{ExtractionResult, Method};
use news_pipeline::ingest::providers::SourceContext;
use news_pipeline::ingest::types::Extractor;
use news_pipeline::store::IngestionEngine;
use news_pipeline::IngestError;

/// Extractor double: canned results per URL, everything else fails.
#[derive(Default)]
pub struct StubExtractor {
    results: Mutex<HashMap<String, (String, String)>>,
    pub calls: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
}

impl StubExtractor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(self: Arc<Self>, url: &str, title: &str, content: &str) -> Arc<Self> {
        self.results
            .lock()
            .unwrap()
            .insert(url.to_string(), (title.to_string(), content.to_string()));
        self
    }

    pub fn set(&self, url: &str, title: &str, content: &str) {
        self.results
            .lock()
            .unwrap()
            .insert(url.to_string(), (title.to_string(), content.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        match self.results.lock().unwrap().get(url) {
            Some((title, content)) => Ok(ExtractionResult {
                title: title.clone(),
                content: content.clone(),
                method: Method::Readability,
                paywalled: false,
            }),
            None => Err(IngestError::ExtractionFailed {
                url: url.to_string(),
            }),
        }
    }

    async fn ready(&self) -> bool {
        true
    }
}

pub fn context(engine: Arc<IngestionEngine>, extractor: Arc<StubExtractor>) -> SourceContext {
    SourceContext::new(engine, extractor, reqwest::Client::new(), 500)
}

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {path}: {e}"))
}
