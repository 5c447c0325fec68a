// src/extract/server.rs
//! HTTP surface of the extractor service.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::Cascade;

#[derive(Clone)]
pub struct ExtractorState {
    pub cascade: Arc<Cascade>,
}

pub fn router(state: ExtractorState) -> Router {
    Router::new()
        .route("/extract", post(extract))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ExtractReq {
    #[serde(default)]
    url: String,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn extract(
    State(state): State<ExtractorState>,
    payload: Result<Json<ExtractReq>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rej) => {
            tracing::debug!(error = %rej, "rejecting /extract body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid JSON, expected {\"url\": \"...\"}" })),
            )
                .into_response();
        }
    };

    let url = req.url.trim();
    if url.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing url field" })),
        )
            .into_response();
    }

    match state.cascade.extract(url).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "Could not extract content", "url": url })),
        )
            .into_response(),
    }
}
