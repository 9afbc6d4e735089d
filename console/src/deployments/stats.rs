//! Statistics derived from the deployment set

use serde::Serialize;

use crate::models::deployment::{DeploymentRecord, DeploymentStatus};

/// Aggregate view of a deployment set; never stored as a source of truth
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub average_duration_seconds: f64,
    pub success_rate_percent: f64,
}

/// Fold `records` into [`DerivedStats`]
///
/// Rates and averages are 0 when there is nothing to divide by.
pub fn compute_stats(records: &[DeploymentRecord]) -> DerivedStats {
    let total = records.len();
    let successful = count_status(records, DeploymentStatus::Success);
    let failed = count_status(records, DeploymentStatus::Failed);

    let success_rate_percent = if total > 0 {
        successful as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let durations_ms: Vec<i64> = records
        .iter()
        .filter(|r| r.status.is_terminal())
        .filter_map(|r| r.duration())
        .map(|d| d.num_milliseconds())
        .collect();

    let average_duration_seconds = if durations_ms.is_empty() {
        0.0
    } else {
        durations_ms.iter().sum::<i64>() as f64 / durations_ms.len() as f64 / 1000.0
    };

    DerivedStats {
        total,
        successful,
        failed,
        average_duration_seconds,
        success_rate_percent,
    }
}

fn count_status(records: &[DeploymentRecord], status: DeploymentStatus) -> usize {
    records.iter().filter(|r| r.status == status).count()
}
