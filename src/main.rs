//! News pipeline: polls feeds and section pages, extracts full text through
//! the article-extractor service and republishes everything as RSS.

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;

use news_pipeline::config::PipelineConfig;
use news_pipeline::ingest::client::{wait_ready, HttpExtractor};
use news_pipeline::ingest::providers::SourceContext;
use news_pipeline::ingest::{build_scheduler, types::Extractor};
use news_pipeline::metrics::Metrics;
use news_pipeline::serve::{router, FeedState};
use news_pipeline::store::IngestionEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    news_pipeline::init_tracing();

    let cfg = PipelineConfig::load().context("loading pipeline config")?;
    let metrics = Metrics::init().context("installing prometheus recorder")?;

    let engine = Arc::new(IngestionEngine::new(
        cfg.limits.feed_max,
        cfg.limits.seen_max,
    ));
    let client = reqwest::Client::builder()
        .build()
        .context("building http client")?;
    let extractor: Arc<dyn Extractor> = Arc::new(HttpExtractor::new(
        client.clone(),
        &cfg.extractor.url,
        cfg.extractor.timeout(),
    ));
    let ctx = SourceContext::new(
        engine.clone(),
        extractor.clone(),
        client,
        cfg.limits.min_content_length,
    );
    let mut scheduler = build_scheduler(&cfg, &ctx)?;

    let listener = TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    tracing::info!(
        bind = %cfg.server.bind,
        feeds = cfg.feeds.len(),
        sections = cfg.sections.len(),
        "feed server listening"
    );
    let app = router(FeedState::new(engine.clone(), &cfg), Some(&metrics));

    let ready_attempts = cfg.extractor.ready_attempts;
    let ready_delay = cfg.extractor.ready_delay();
    tokio::spawn(async move {
        wait_ready(extractor.as_ref(), ready_attempts, ready_delay).await;
        scheduler.seed().await;
        tracing::info!(items = engine.len(), "seeding done");
        scheduler.run().await;
    });

    axum::serve(listener, app).await.context("feed server")?;
    Ok(())
}
