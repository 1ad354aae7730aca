use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Chatdesk application.
///
/// Loaded from `~/.chatdesk/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatdeskConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ChatdeskConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ChatdeskConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the key-value database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.chatdesk/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Conversation and sidebar settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// JSON answer table to load instead of the bundled one.
    pub responses_path: Option<String>,
    /// Number of messages shown in the history sidebar.
    pub history_preview_count: usize,
    /// Characters kept from a message before the preview is cut with `...`.
    pub preview_max_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            responses_path: None,
            history_preview_count: 5,
            preview_max_chars: 50,
        }
    }
}

/// Durable storage settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file name, relative to `general.data_dir`.
    pub db_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: "chatdesk.db".to_string(),
        }
    }
}
