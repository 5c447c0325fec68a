// src/lib.rs
// Shared crate root for both binaries and the integration tests.

pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod ingest;
pub mod metrics;
pub mod serve;
pub mod store;
pub mod text;

pub use crate::error::IngestError;
pub use crate::store::{FeedItem, IngestionEngine};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "news_pipeline=info,warn";

/// Install the global subscriber. `RUST_LOG` wins over the default filter;
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
