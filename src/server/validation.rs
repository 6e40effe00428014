//! Configuration validation
//!
//! Hard errors for settings the server cannot run with, warnings for
//! settings that only disable a feature.

use super::config::AppConfig;
use anyhow::{bail, Result};
use tracing::warn;

/// Validate configuration before the server starts
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.editor.history_capacity == 0 {
        bail!("editor.history_capacity must be at least 1");
    }
    if config.editor.autosave_quiet_ms == 0 {
        bail!("editor.autosave_quiet_ms must be positive");
    }
    if config.database.max_connections == 0 {
        bail!("database.max_connections must be at least 1");
    }
    if config.stock.per_page == 0 {
        bail!("stock.per_page must be at least 1");
    }

    if config.stock.access_key.as_deref().map_or(true, |key| key.trim().is_empty()) {
        warn!("Stock photo access key is not set; stock search will be unavailable");
    }

    let is_production = std::env::var("PIXEL_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false);

    if is_production && config.server.host == "0.0.0.0" {
        warn!(
            "SECURITY WARNING: Server is binding to all interfaces (0.0.0.0) in production. \
             Identity headers must only be set by a trusted reverse proxy."
        );
    }

    Ok(())
}
