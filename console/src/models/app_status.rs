//! Application status snapshots pushed over the live channel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime status of a named app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    Live,
    Deploying,
    Failing,
    Stopped,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Live => "live",
            AppStatus::Deploying => "deploying",
            AppStatus::Failing => "failing",
            AppStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for AppStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known state of one app, keyed by `name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppStatusSnapshot {
    pub name: String,

    pub status: AppStatus,

    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub last_deploy_sha: Option<String>,

    #[serde(default)]
    pub last_deploy_timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub log_lines: Vec<String>,
}

impl AppStatusSnapshot {
    pub fn new(name: impl Into<String>, status: AppStatus) -> Self {
        Self {
            name: name.into(),
            status,
            domain: String::new(),
            port: None,
            last_deploy_sha: None,
            last_deploy_timestamp: None,
            log_lines: Vec::new(),
        }
    }
}

/// Inbound message on the `/ws` channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveMessage {
    /// Full board, sent once after the handshake
    Init { data: Vec<AppStatusSnapshot> },

    /// One app changed
    StatusUpdate {
        app_name: String,
        data: AppStatusSnapshot,
    },
}
