//! App command API client
//!
//! These endpoints sit on the live dashboard surface and take no credential.

use openapi_client::models::AppDeployRequest;

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Trigger a deploy of a named app
    pub async fn deploy_app(&self, name: &str) -> Result<(), ConsoleError> {
        let body = AppDeployRequest {
            app_name: name.to_string(),
        };
        self.post_no_content(&["api", "apps", name, "deploy"], None, Some(&body))
            .await
    }

    /// Stop a named app
    pub async fn stop_app(&self, name: &str) -> Result<(), ConsoleError> {
        self.post_no_content::<()>(&["api", "apps", name, "stop"], None, None)
            .await
    }
}
