// src/config/mod.rs
pub mod extractor;
pub mod pipeline;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub use extractor::ExtractorConfig;
pub use pipeline::PipelineConfig;

/// Load a TOML config from an explicit path.
pub fn load_from<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}

/// Load a TOML config using env var + fallbacks:
/// 1) `$<env_var>` (must exist if set)
/// 2) `default_path`
/// 3) `T::default()`
pub fn load_default<T: DeserializeOwned + Default>(env_var: &str, default_path: &str) -> Result<T> {
    if let Ok(p) = std::env::var(env_var) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        return Err(anyhow!("{env_var} points to non-existent path"));
    }
    let pb = PathBuf::from(default_path);
    if pb.exists() {
        return load_from(&pb);
    }
    tracing::info!(path = default_path, "no config file, using built-in defaults");
    Ok(T::default())
}

/// Non-empty env var, trimmed.
pub(crate) fn env_override(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
