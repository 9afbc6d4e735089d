//! Deployment models

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::truncate;

/// Deployment lifecycle status as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Queued,
    InProgress,
    Success,
    Failed,
}

impl DeploymentStatus {
    /// Queued or in progress
    pub fn is_active(&self) -> bool {
        matches!(self, DeploymentStatus::Queued | DeploymentStatus::InProgress)
    }

    /// Success or failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Success | DeploymentStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Queued => "queued",
            DeploymentStatus::InProgress => "in_progress",
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment record as served by `/api/deployments`
///
/// Field names follow the server's JSON verbatim. Unset values arrive as
/// zero values (`""`, `0`, `0001-01-01T00:00:00Z`) and are read as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Owner", default)]
    pub owner: String,

    #[serde(rename = "Repo", default)]
    pub repo: String,

    #[serde(rename = "Ref", default)]
    pub git_ref: String,

    #[serde(rename = "SHA", default)]
    pub sha: String,

    #[serde(rename = "Environment", default)]
    pub environment: String,

    #[serde(rename = "Status")]
    pub status: DeploymentStatus,

    #[serde(rename = "StartedAt")]
    pub started_at: DateTime<Utc>,

    #[serde(
        rename = "CompletedAt",
        default,
        deserialize_with = "set_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(rename = "URL", default, deserialize_with = "non_zero", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "Port", default, deserialize_with = "non_zero", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(rename = "ProjectType", default, deserialize_with = "non_zero", skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,

    #[serde(rename = "Error", default, deserialize_with = "non_zero", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(rename = "CloneURL", default, deserialize_with = "non_zero", skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,

    #[serde(rename = "PRNumber", default, deserialize_with = "non_zero", skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<i64>,

    #[serde(rename = "GitHubDeploymentID", default, deserialize_with = "non_zero", skip_serializing_if = "Option::is_none")]
    pub github_deployment_id: Option<i64>,

    #[serde(rename = "LogPath", default, deserialize_with = "non_zero", skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
}

impl DeploymentRecord {
    /// Minimal record, mostly useful for building fixtures
    pub fn new(id: impl Into<String>, status: DeploymentStatus, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            owner: String::new(),
            repo: String::new(),
            git_ref: String::new(),
            sha: String::new(),
            environment: String::new(),
            status,
            started_at,
            completed_at: None,
            url: None,
            port: None,
            project_type: None,
            error: None,
            clone_url: None,
            pr_number: None,
            github_deployment_id: None,
            log_path: None,
        }
    }

    /// Wall time from start to completion, for finished records
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }

    /// First 12 characters of the ID, for tables
    pub fn short_id(&self) -> &str {
        truncate(&self.id, 12)
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn non_zero<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default + PartialEq,
{
    let value = Option::<T>::deserialize(deserializer)?;
    Ok(value.filter(|v| *v != T::default()))
}

fn set_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(value.filter(|t| t.year() > 1))
}
