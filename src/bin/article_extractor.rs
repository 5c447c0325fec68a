//! Article extractor service: `POST /extract` runs the extraction cascade.

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;

use news_pipeline::config::ExtractorConfig;
use news_pipeline::extract::browser::{
    spawn_ruleset_refresh, BrowserPool, RemoteBrowserLauncher, RulesetUpdater,
};
use news_pipeline::extract::server::{router, ExtractorState};
use news_pipeline::extract::Cascade;
use news_pipeline::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    news_pipeline::init_tracing();

    let cfg = ExtractorConfig::load().context("loading extractor config")?;
    let metrics = Metrics::init().context("installing prometheus recorder")?;
    let client = reqwest::Client::builder()
        .build()
        .context("building http client")?;

    let mut cascade = Cascade::new(client.clone(), &cfg).context("building extraction cascade")?;
    if cfg.browser.enabled() {
        let launcher = Arc::new(RemoteBrowserLauncher::new(client.clone(), &cfg.browser));
        let pool = Arc::new(BrowserPool::new(launcher));
        if !cfg.browser.ruleset_url.trim().is_empty() {
            let updater = RulesetUpdater::new(
                client.clone(),
                cfg.browser.ruleset_url.trim(),
                cfg.browser.ruleset_path.clone(),
            );
            spawn_ruleset_refresh(updater, pool.clone(), cfg.browser.ruleset_refresh());
        }
        tracing::info!(endpoint = %cfg.browser.endpoint, domains = cfg.browser.domains.len(), "browser bypass enabled");
        cascade = cascade.with_browser(pool);
    } else {
        tracing::info!("no browser endpoint configured, bypass strategy disabled");
    }

    let state = ExtractorState {
        cascade: Arc::new(cascade),
    };
    let app = router(state).merge(metrics.router());

    let listener = TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    tracing::info!(bind = %cfg.bind, "article extractor listening");
    axum::serve(listener, app).await.context("extractor server")?;
    Ok(())
}
