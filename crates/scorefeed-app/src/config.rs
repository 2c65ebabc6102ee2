//! Application configuration.
//!
//! A single TOML file carries the server settings and the sessions to open
//! at startup, each with its roster and scoring model. Scoring weights are
//! data, not code: competitions change multipliers year to year, so they
//! live in the config file.

use std::path::Path;

use scorefeed_server::ServerConfig;
use scorefeed_store::SessionConfig;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP/WebSocket server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Sessions opened at startup.
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            sessions: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration, falling back to defaults when no file exists.
    pub fn load() -> AppResult<Self> {
        let config_path = std::env::var("SCOREFEED_CONFIG")
            .unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}
