//! Console configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::workers::socket;

/// Floor for the live reconnect delay; zero would spin on a dead server
const MIN_RECONNECT_DELAY_SECS: u64 = 1;

/// Main console options
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    /// Admin API base URL
    pub api_base_url: String,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Storage configuration
    pub layout: StorageLayout,

    /// Live channel worker options
    pub live_worker: socket::Options,

    /// Also follow the authenticated deployment feed while watching
    pub follow_deployments: bool,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self::from_settings(StorageLayout::default(), &Settings::default())
    }
}

impl ConsoleOptions {
    /// Options from a loaded settings file
    pub fn from_settings(layout: StorageLayout, settings: &Settings) -> Self {
        Self {
            api_base_url: settings.api.base_url.clone(),
            request_timeout: settings.api.request_timeout(),
            layout,
            live_worker: socket::Options {
                reconnect_delay: Duration::from_secs(
                    settings.live.reconnect_delay_secs.max(MIN_RECONNECT_DELAY_SECS),
                ),
            },
            follow_deployments: true,
            max_shutdown_delay: Duration::from_secs(5),
        }
    }

    /// Override the API base URL
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }
}
