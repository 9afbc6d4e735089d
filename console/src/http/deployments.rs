//! Deployment API client

use openapi_client::models::{CommandResponse, RedeployResponse};
use secrecy::SecretString;

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::models::deployment::DeploymentRecord;

impl HttpClient {
    /// List every deployment the server tracks
    pub async fn list_deployments(
        &self,
        token: &SecretString,
    ) -> Result<Vec<DeploymentRecord>, ConsoleError> {
        // the server answers `null` when it has nothing to report
        let records: Option<Vec<DeploymentRecord>> =
            self.get(&["api", "deployments"], Some(token)).await?;
        Ok(records.unwrap_or_default())
    }

    /// Get a single deployment
    pub async fn get_deployment(
        &self,
        id: &str,
        token: &SecretString,
    ) -> Result<DeploymentRecord, ConsoleError> {
        self.get(&["api", "deployments", id], Some(token)).await
    }

    /// Queue a new deployment with the same parameters as `id`
    pub async fn redeploy_deployment(
        &self,
        id: &str,
        token: &SecretString,
    ) -> Result<RedeployResponse, ConsoleError> {
        self.post::<_, ()>(&["api", "deployments", id, "redeploy"], Some(token), None)
            .await
    }

    /// Stop a deployment
    pub async fn stop_deployment(
        &self,
        id: &str,
        token: &SecretString,
    ) -> Result<CommandResponse, ConsoleError> {
        self.post::<_, ()>(&["api", "deployments", id, "stop"], Some(token), None)
            .await
    }

    /// Fetch the build/run log of a deployment as plain text
    pub async fn get_deployment_logs(
        &self,
        id: &str,
        token: &SecretString,
    ) -> Result<String, ConsoleError> {
        self.get_text(&["api", "deployments", id, "logs"], Some(token))
            .await
    }
}
