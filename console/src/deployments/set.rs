//! The in-memory deployment set and its read views

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, TimeZone};
use serde::Serialize;

use crate::deployments::stats::{compute_stats, DerivedStats};
use crate::models::deployment::{DeploymentRecord, DeploymentStatus};

/// Number of days covered by [`DeploymentSet::timeline`]
pub const TIMELINE_DAYS: i64 = 7;

/// How [`DeploymentSet::upsert`] applied a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// Successful and failed deployments started on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub successful: usize,
    pub failed: usize,
}

/// Deployment records keyed by ID, with stats kept in step with every mutation
#[derive(Debug, Clone, Default)]
pub struct DeploymentSet {
    records: Vec<DeploymentRecord>,
    stats: DerivedStats,
}

impl DeploymentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<DeploymentRecord>) -> Self {
        let mut set = Self::new();
        set.replace_all(records);
        set
    }

    /// Replace everything with a server snapshot
    ///
    /// A snapshot repeating an ID keeps the last copy, at the first position.
    pub fn replace_all(&mut self, records: Vec<DeploymentRecord>) {
        self.records.clear();
        for record in records {
            match self.position(&record.id) {
                Some(idx) => self.records[idx] = record,
                None => self.records.push(record),
            }
        }
        self.recompute();
    }

    /// Replace the record with the same ID, or append it
    pub fn upsert(&mut self, record: DeploymentRecord) -> Upsert {
        let outcome = match self.position(&record.id) {
            Some(idx) => {
                self.records[idx] = record;
                Upsert::Replaced
            }
            None => {
                self.records.push(record);
                Upsert::Inserted
            }
        };
        self.recompute();
        outcome
    }

    /// Replace the record with the same ID; unknown IDs are left out
    pub fn replace_existing(&mut self, record: DeploymentRecord) -> bool {
        match self.position(&record.id) {
            Some(idx) => {
                self.records[idx] = record;
                self.recompute();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&DeploymentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records in arrival order
    pub fn records(&self) -> &[DeploymentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> DerivedStats {
        self.stats
    }

    /// Queued or in-progress records
    pub fn active(&self) -> Vec<&DeploymentRecord> {
        self.records.iter().filter(|r| r.status.is_active()).collect()
    }

    /// All records, newest start first
    pub fn newest_first(&self) -> Vec<&DeploymentRecord> {
        let mut sorted: Vec<&DeploymentRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sorted
    }

    /// The `limit` most recently started records
    pub fn recent(&self, limit: usize) -> Vec<&DeploymentRecord> {
        let mut sorted = self.newest_first();
        sorted.truncate(limit);
        sorted
    }

    pub fn by_environment(&self) -> BTreeMap<String, Vec<&DeploymentRecord>> {
        let mut grouped: BTreeMap<String, Vec<&DeploymentRecord>> = BTreeMap::new();
        for record in &self.records {
            grouped
                .entry(record.environment.clone())
                .or_default()
                .push(record);
        }
        grouped
    }

    /// Daily success/failure counts for `today` and the six days before it,
    /// oldest first, bucketed by the start date as seen in `tz`
    pub fn timeline<Tz: TimeZone>(&self, today: NaiveDate, tz: &Tz) -> Vec<DailyCount> {
        let mut days: Vec<DailyCount> = (0..TIMELINE_DAYS)
            .rev()
            .map(|offset| DailyCount {
                date: today - Duration::days(offset),
                successful: 0,
                failed: 0,
            })
            .collect();

        for record in &self.records {
            let date = record.started_at.with_timezone(tz).date_naive();
            if let Some(day) = days.iter_mut().find(|d| d.date == date) {
                match record.status {
                    DeploymentStatus::Success => day.successful += 1,
                    DeploymentStatus::Failed => day.failed += 1,
                    _ => {}
                }
            }
        }

        days
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn recompute(&mut self) {
        self.stats = compute_stats(&self.records);
    }
}
