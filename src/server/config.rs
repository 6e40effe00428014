//! Server configuration types

use pixel_canvas::EditorSettings;
use pixel_core::PlanLimits;
use pixel_media::{MediaSettings, StockSettings};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub plans: PlanLimits,
    #[serde(default)]
    pub media: MediaSettings,
    #[serde(default)]
    pub stock: StockSettings,
}

impl AppConfig {
    /// Copy safe to print: secrets are masked
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.stock.access_key.is_some() {
            config.stock.access_key = Some("********".to_string());
        }
        config
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// SQLite configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite://data/pixel.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// Editor session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditorConfig {
    #[serde(default = "default_autosave_quiet_ms")]
    pub autosave_quiet_ms: u64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: i64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_autosave_quiet_ms() -> u64 {
    EditorSettings::default().autosave_quiet_ms
}

fn default_history_capacity() -> usize {
    EditorSettings::default().history_capacity
}

fn default_session_idle_secs() -> i64 {
    EditorSettings::default().session_idle_secs
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_quiet_ms: default_autosave_quiet_ms(),
            history_capacity: default_history_capacity(),
            session_idle_secs: default_session_idle_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl EditorConfig {
    /// Settings handed to the session manager
    #[must_use]
    pub fn settings(&self) -> EditorSettings {
        EditorSettings {
            history_capacity: self.history_capacity,
            autosave_quiet_ms: self.autosave_quiet_ms,
            session_idle_secs: self.session_idle_secs,
        }
    }
}
