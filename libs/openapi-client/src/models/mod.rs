//! API models

use serde::{Deserialize, Serialize};

/// Admin login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Admin login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Response to a redeploy command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedeployResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub id: String,
}

/// Generic command acknowledgement (`{"message": ..., "id": ...}`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Body of `POST /api/apps/{name}/deploy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDeployRequest {
    pub app_name: String,
}

/// Error response
///
/// The server only ever sends `error`; `message` and `details` are kept for
/// proxies that wrap it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Best human-readable message carried by the payload, if any
    pub fn reason(&self) -> Option<&str> {
        [self.error.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}
