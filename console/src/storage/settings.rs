//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Console settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Directory for rolling log files; unset disables file logging
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Admin API configuration
    #[serde(default)]
    pub api: ApiSettings,

    /// Live status channel configuration
    #[serde(default)]
    pub live: LiveSettings,
}

/// Admin API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the admin API (the dockrune admin port)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Live status channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSettings {
    /// Fixed delay before every reconnect attempt
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

fn default_reconnect_delay() -> u64 {
    3
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay(),
        }
    }
}
