//! Board of app status snapshots fed by the live channel

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::app_status::{AppStatus, AppStatusSnapshot, LiveMessage};

/// State transition emitted for observers (the presentation layer)
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Connected,
    Disconnected,
    /// The whole board was replaced
    Snapshot { apps: usize },
    /// A known app changed status
    StatusChanged {
        name: String,
        from: AppStatus,
        to: AppStatus,
    },
    /// A known app was refreshed without a status change
    Refreshed { name: String },
    /// An app the board had not seen before was appended
    Added { name: String, status: AppStatus },
}

/// Number of apps per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoardCounts {
    pub live: usize,
    pub deploying: usize,
    pub failing: usize,
    pub stopped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LiveBoard {
    apps: Vec<AppStatusSnapshot>,
    connected: bool,
    loaded: bool,
    last_update: Option<DateTime<Utc>>,
}

impl LiveBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound message received at `now`
    ///
    /// Updates are keyed by the envelope's `app_name`, which also overrides
    /// the name carried in the snapshot. An unknown name is appended, the
    /// same upsert policy the deployment store uses.
    pub fn apply(&mut self, message: LiveMessage, now: DateTime<Utc>) -> LiveEvent {
        self.last_update = Some(now);

        match message {
            LiveMessage::Init { data } => {
                self.apps = data;
                self.loaded = true;
                LiveEvent::Snapshot {
                    apps: self.apps.len(),
                }
            }
            LiveMessage::StatusUpdate { app_name, mut data } => {
                data.name = app_name.clone();
                match self.apps.iter_mut().find(|a| a.name == app_name) {
                    Some(existing) => {
                        let from = existing.status;
                        let to = data.status;
                        *existing = data;
                        if from != to {
                            LiveEvent::StatusChanged {
                                name: app_name,
                                from,
                                to,
                            }
                        } else {
                            LiveEvent::Refreshed { name: app_name }
                        }
                    }
                    None => {
                        let status = data.status;
                        self.apps.push(data);
                        LiveEvent::Added {
                            name: app_name,
                            status,
                        }
                    }
                }
            }
        }
    }

    /// Record a connection state change; returns an event only on a change
    pub fn set_connected(&mut self, connected: bool) -> Option<LiveEvent> {
        if self.connected == connected {
            return None;
        }
        self.connected = connected;
        Some(if connected {
            LiveEvent::Connected
        } else {
            LiveEvent::Disconnected
        })
    }

    pub fn apps(&self) -> &[AppStatusSnapshot] {
        &self.apps
    }

    pub fn get(&self, name: &str) -> Option<&AppStatusSnapshot> {
        self.apps.iter().find(|a| a.name == name)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True once the initial snapshot arrived
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn with_status(&self, status: AppStatus) -> Vec<&AppStatusSnapshot> {
        self.apps.iter().filter(|a| a.status == status).collect()
    }

    pub fn counts(&self) -> BoardCounts {
        let mut counts = BoardCounts::default();
        for app in &self.apps {
            match app.status {
                AppStatus::Live => counts.live += 1,
                AppStatus::Deploying => counts.deploying += 1,
                AppStatus::Failing => counts.failing += 1,
                AppStatus::Stopped => counts.stopped += 1,
            }
        }
        counts
    }
}
