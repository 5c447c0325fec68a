// src/serve/mod.rs
//! Feed server: RSS views over the in-memory store.
pub mod rss;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::pipeline::ServerCfg;
use crate::config::PipelineConfig;
use crate::metrics::Metrics;
use crate::store::{now_rfc2822, FeedItem, IngestionEngine};

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

#[derive(Clone)]
pub struct FeedState {
    engine: Arc<IngestionEngine>,
    channel: Arc<ServerCfg>,
    /// lowercase slug -> tag as configured
    sources: Arc<BTreeMap<String, String>>,
    /// lowercase category -> tags
    categories: Arc<BTreeMap<String, Vec<String>>>,
}

impl FeedState {
    pub fn new(engine: Arc<IngestionEngine>, cfg: &PipelineConfig) -> Self {
        let sources = cfg
            .source_tags()
            .into_iter()
            .map(|t| (t.to_ascii_lowercase(), t))
            .collect();
        Self {
            engine,
            channel: Arc::new(cfg.server.clone()),
            sources: Arc::new(sources),
            categories: Arc::new(cfg.categories()),
        }
    }
}

pub fn router(state: FeedState, metrics: Option<&Metrics>) -> Router {
    let mut r = Router::new()
        .route("/", get(all))
        .route("/rss", get(all))
        .route("/feed", get(all))
        .route("/rss/{source}", get(by_source))
        .route("/rss/cat/{category}", get(by_category))
        .route("/health", get(health))
        .with_state(state);
    if let Some(m) = metrics {
        r = r.merge(m.router());
    }
    r.layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health(State(st): State<FeedState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "items": st.engine.len() }))
}

async fn all(State(st): State<FeedState>) -> Response {
    let items = st.engine.snapshot();
    rss_response(&st.channel, None, &items)
}

async fn by_source(State(st): State<FeedState>, Path(source): Path<String>) -> Response {
    let Some(tag) = st.sources.get(&source.to_ascii_lowercase()) else {
        return not_found(&format!("unknown source: {source}"));
    };
    let items = st.engine.query(|it| it.source.eq_ignore_ascii_case(tag));
    rss_response(&st.channel, Some(tag.as_str()), &items)
}

async fn by_category(State(st): State<FeedState>, Path(category): Path<String>) -> Response {
    let key = category.to_ascii_lowercase();
    let Some(tags) = st.categories.get(&key) else {
        return not_found(&format!("unknown category: {category}"));
    };
    let items = st
        .engine
        .query(|it| tags.iter().any(|t| it.source.eq_ignore_ascii_case(t)));
    rss_response(&st.channel, Some(key.as_str()), &items)
}

fn rss_response(cfg: &ServerCfg, view: Option<&str>, items: &[FeedItem]) -> Response {
    let title = match view {
        Some(v) => format!("{} - {}", cfg.title, v),
        None => cfg.title.clone(),
    };
    let last_build = now_rfc2822();
    let channel = rss::Channel {
        title: &title,
        link: &cfg.link,
        description: &cfg.description,
        last_build_date: &last_build,
    };
    match rss::render(&channel, items) {
        Ok(body) => ([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "rss render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "render failed").into_response()
        }
    }
}

fn not_found(msg: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
}
