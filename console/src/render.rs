//! Terminal rendering of console state
//!
//! Pure formatting: everything here takes plain values and returns strings.

use std::collections::BTreeMap;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::deployments::set::DailyCount;
use crate::deployments::stats::DerivedStats;
use crate::live::board::{BoardCounts, LiveEvent};
use crate::models::app_status::{AppStatus, AppStatusSnapshot};
use crate::models::deployment::{DeploymentRecord, DeploymentStatus};
use crate::utils::{format_duration, truncate};

const TIMELINE_BAR_WIDTH: usize = 30;

fn deployment_status(status: DeploymentStatus) -> String {
    match status {
        DeploymentStatus::Queued => status.as_str().yellow().to_string(),
        DeploymentStatus::InProgress => status.as_str().cyan().to_string(),
        DeploymentStatus::Success => status.as_str().green().to_string(),
        DeploymentStatus::Failed => status.as_str().red().to_string(),
    }
}

fn app_status(status: AppStatus) -> String {
    match status {
        AppStatus::Live => status.as_str().green().to_string(),
        AppStatus::Deploying => status.as_str().cyan().to_string(),
        AppStatus::Failing => status.as_str().red().to_string(),
        AppStatus::Stopped => status.as_str().dimmed().to_string(),
    }
}

/// Headline numbers
pub fn format_stats(stats: &DerivedStats) -> String {
    format!(
        "{} deployments, {} successful, {} failed, {:.1}% success, avg {:.1}s",
        stats.total.to_string().bold(),
        stats.successful.to_string().green(),
        stats.failed.to_string().red(),
        stats.success_rate_percent,
        stats.average_duration_seconds,
    )
}

/// Deployment table: ID, repository, environment, status, URL
pub fn format_deployments_table(records: &[DeploymentRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Repository", "Env", "Status", "Started", "URL"]);

    for record in records {
        table.add_row(vec![
            Cell::new(record.short_id()),
            Cell::new(record.full_name()),
            Cell::new(&record.environment),
            Cell::new(deployment_status(record.status)),
            Cell::new(record.started_at.format("%Y-%m-%d %H:%M")),
            Cell::new(record.url.as_deref().unwrap_or("-")),
        ]);
    }

    table.to_string()
}

/// Key/value detail of one deployment
pub fn format_deployment_detail(record: &DeploymentRecord) -> String {
    let mut lines = vec![
        format!("{} {}", "ID:".bold(), record.id),
        format!("{} {}", "Repository:".bold(), record.full_name()),
        format!("{} {}", "Ref:".bold(), record.git_ref),
        format!("{} {}", "SHA:".bold(), record.sha),
        format!("{} {}", "Environment:".bold(), record.environment),
        format!("{} {}", "Status:".bold(), deployment_status(record.status)),
        format!("{} {}", "Started:".bold(), record.started_at.to_rfc3339()),
    ];

    if let Some(completed) = record.completed_at {
        lines.push(format!("{} {}", "Completed:".bold(), completed.to_rfc3339()));
    }
    if let Some(duration) = record.duration() {
        lines.push(format!("{} {}", "Duration:".bold(), format_duration(duration)));
    }
    if let Some(url) = &record.url {
        lines.push(format!("{} {}", "URL:".bold(), url));
    }
    if let Some(port) = record.port {
        lines.push(format!("{} {}", "Port:".bold(), port));
    }
    if let Some(project_type) = &record.project_type {
        lines.push(format!("{} {}", "Type:".bold(), project_type));
    }
    if let Some(pr) = record.pr_number {
        lines.push(format!("{} #{}", "Pull request:".bold(), pr));
    }
    if let Some(error) = &record.error {
        lines.push(format!("{} {}", "Error:".bold(), error.red()));
    }

    lines.join("\n")
}

/// One line per day, oldest first
pub fn format_timeline(days: &[DailyCount]) -> String {
    let peak = days
        .iter()
        .map(|d| d.successful + d.failed)
        .max()
        .unwrap_or(0)
        .max(1);

    days.iter()
        .map(|day| {
            let ok = day.successful * TIMELINE_BAR_WIDTH / peak;
            let bad = day.failed * TIMELINE_BAR_WIDTH / peak;
            format!(
                "{} {}{} {}/{}",
                day.date.format("%a %m-%d"),
                "█".repeat(ok).green(),
                "█".repeat(bad).red(),
                day.successful,
                day.failed,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Record count per environment
pub fn format_environments(groups: &BTreeMap<String, Vec<DeploymentRecord>>) -> String {
    groups
        .iter()
        .map(|(env, records)| {
            let name = if env.is_empty() { "(none)" } else { env.as_str() };
            format!("{}: {}", name.bold(), records.len())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// App board table
pub fn format_apps_table(apps: &[AppStatusSnapshot]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["App", "Status", "Domain", "Port", "Last deploy"]);

    for app in apps {
        let last_deploy = match (&app.last_deploy_sha, app.last_deploy_timestamp) {
            (Some(sha), Some(at)) => {
                format!("{} at {}", truncate(sha, 7), at.format("%Y-%m-%d %H:%M"))
            }
            (Some(sha), None) => truncate(sha, 7).to_string(),
            (None, Some(at)) => at.format("%Y-%m-%d %H:%M").to_string(),
            (None, None) => "-".to_string(),
        };

        table.add_row(vec![
            Cell::new(&app.name),
            Cell::new(app_status(app.status)),
            Cell::new(if app.domain.is_empty() { "-" } else { app.domain.as_str() }),
            Cell::new(app.port.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(last_deploy),
        ]);
    }

    table.to_string()
}

pub fn format_counts(counts: &BoardCounts) -> String {
    format!(
        "{} live, {} deploying, {} failing, {} stopped",
        counts.live.to_string().green(),
        counts.deploying.to_string().cyan(),
        counts.failing.to_string().red(),
        counts.stopped,
    )
}

/// One line describing a board transition
pub fn format_event(event: &LiveEvent) -> String {
    match event {
        LiveEvent::Connected => "connected".green().to_string(),
        LiveEvent::Disconnected => "disconnected, reconnecting...".yellow().to_string(),
        LiveEvent::Snapshot { apps } => format!("board loaded with {} apps", apps),
        LiveEvent::StatusChanged { name, from, to } => {
            format!("{}: {} -> {}", name.bold(), app_status(*from), app_status(*to))
        }
        LiveEvent::Refreshed { name } => format!("{}: refreshed", name.bold()),
        LiveEvent::Added { name, status } => {
            format!("{}: new app ({})", name.bold(), app_status(*status))
        }
    }
}
