//! Live dashboard: the app board plus its deploy/stop commands

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::live::board::{BoardCounts, LiveBoard, LiveEvent};
use crate::models::app_status::{AppStatusSnapshot, LiveMessage};
use crate::sync::cancel::cancellable;
use crate::sync::single_flight::SingleFlight;
use crate::workers::socket::PushHandler;

const EVENT_CAPACITY: usize = 64;

/// Outcome of a fire-and-forget app command
///
/// The board is never touched by a command; the resulting status arrives
/// later over the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAck {
    Accepted,
    Rejected(String),
}

pub struct LiveDashboard {
    board: RwLock<LiveBoard>,
    events: broadcast::Sender<LiveEvent>,
    http_client: Arc<HttpClient>,
    flights: SingleFlight,
    cancel: CancellationToken,
}

impl LiveDashboard {
    pub fn new(http_client: Arc<HttpClient>, cancel: CancellationToken) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            board: RwLock::new(LiveBoard::new()),
            events,
            http_client,
            flights: SingleFlight::new(),
            cancel,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, LiveBoard> {
        self.board.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LiveBoard> {
        self.board.write().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, event: LiveEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Observe board transitions
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.events.subscribe()
    }

    // ================================ INBOUND =================================== //

    /// Apply one raw text frame; malformed frames are logged and dropped
    pub fn handle_text(&self, text: &str) -> Option<LiveEvent> {
        self.handle_text_at(text, Utc::now())
    }

    pub fn handle_text_at(&self, text: &str, now: DateTime<Utc>) -> Option<LiveEvent> {
        let message: LiveMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed live message: {}", e);
                return None;
            }
        };

        let event = self.write().apply(message, now);
        debug!("Live board event: {:?}", event);
        self.publish(event.clone());
        Some(event)
    }

    fn set_connected(&self, connected: bool) {
        let event = self.write().set_connected(connected);
        if let Some(event) = event {
            info!("Live channel {:?}", event);
            self.publish(event);
        }
    }

    // =============================== COMMANDS =================================== //

    /// Ask the server to deploy `name`
    pub async fn deploy(&self, name: &str) -> Result<CommandAck, ConsoleError> {
        let _flight = self.flights.try_begin(&format!("deploy_app:{}", name))?;
        let result = cancellable(&self.cancel, self.http_client.deploy_app(name)).await;
        acknowledge("deploy", name, result)
    }

    /// Ask the server to stop `name`
    pub async fn stop(&self, name: &str) -> Result<CommandAck, ConsoleError> {
        let _flight = self.flights.try_begin(&format!("stop_app:{}", name))?;
        let result = cancellable(&self.cancel, self.http_client.stop_app(name)).await;
        acknowledge("stop", name, result)
    }

    // ================================ READ VIEWS ================================ //

    pub fn apps(&self) -> Vec<AppStatusSnapshot> {
        self.read().apps().to_vec()
    }

    pub fn get(&self, name: &str) -> Option<AppStatusSnapshot> {
        self.read().get(name).cloned()
    }

    pub fn counts(&self) -> BoardCounts {
        self.read().counts()
    }

    pub fn is_connected(&self) -> bool {
        self.read().is_connected()
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_loaded()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.read().last_update()
    }

    /// Abort outstanding commands
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// Transport and server rejections become an acknowledgement; only Busy and
// Cancelled are surfaced as errors.
fn acknowledge(
    action: &str,
    name: &str,
    result: Result<(), ConsoleError>,
) -> Result<CommandAck, ConsoleError> {
    match result {
        Ok(()) => {
            info!("{} of {} accepted", action, name);
            Ok(CommandAck::Accepted)
        }
        Err(ConsoleError::Cancelled) => Err(ConsoleError::Cancelled),
        Err(e) => {
            warn!("{} of {} failed: {}", action, name, e);
            Ok(CommandAck::Rejected(e.to_string()))
        }
    }
}

impl PushHandler for LiveDashboard {
    fn on_open(&self) {
        self.set_connected(true);
    }

    fn on_text(&self, text: &str) {
        self.handle_text(text);
    }

    fn on_close(&self) {
        self.set_connected(false);
    }
}
