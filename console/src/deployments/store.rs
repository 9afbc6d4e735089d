//! Deployment store: fetches, commands and push reconciliation

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Local;
use openapi_client::models::{CommandResponse, RedeployResponse};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::deployments::set::{DailyCount, DeploymentSet, Upsert};
use crate::deployments::stats::DerivedStats;
use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::models::deployment::DeploymentRecord;
use crate::session::state::SessionState;
use crate::sync::cancel::cancellable;
use crate::sync::single_flight::SingleFlight;

/// Message recorded when the list cannot be refreshed
pub const FETCH_FAILED: &str = "Failed to fetch deployments";

const FETCH_ALL: &str = "fetch_all";

/// How many records the "recent" view holds
pub const RECENT_LIMIT: usize = 10;

#[derive(Debug, Default)]
struct StoreState {
    set: DeploymentSet,
    selected: Option<DeploymentRecord>,
    error: Option<String>,
    ws_connected: bool,
}

pub struct DeploymentStore {
    http_client: Arc<HttpClient>,
    session: Arc<SessionState>,
    state: RwLock<StoreState>,
    flights: SingleFlight,
    cancel: CancellationToken,
}

impl DeploymentStore {
    pub fn new(
        http_client: Arc<HttpClient>,
        session: Arc<SessionState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            http_client,
            session,
            state: RwLock::new(StoreState::default()),
            flights: SingleFlight::new(),
            cancel,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn token(&self) -> Result<SecretString, ConsoleError> {
        self.session
            .credential()
            .ok_or_else(|| ConsoleError::AuthError("Not logged in".to_string()))
    }

    // =============================== FETCHING =================================== //

    /// Replace the whole set with the server's current snapshot
    ///
    /// On failure the previous records stay in place and [`FETCH_FAILED`] is
    /// recorded as the store error.
    pub async fn fetch_all(&self) -> Result<(), ConsoleError> {
        let _flight = self.flights.try_begin(FETCH_ALL)?;
        self.fetch_all_locked().await
    }

    async fn fetch_all_locked(&self) -> Result<(), ConsoleError> {
        self.write().error = None;

        let result = match self.token() {
            Ok(token) => cancellable(&self.cancel, self.http_client.list_deployments(&token)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(records) => {
                let mut state = self.write();
                state.set.replace_all(records);
                debug!("Fetched {} deployments", state.set.len());
                Ok(())
            }
            Err(ConsoleError::Cancelled) => Err(ConsoleError::Cancelled),
            Err(e) => {
                error!("Fetch deployments error: {}", e);
                self.write().error = Some(FETCH_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Refresh one record in place
    ///
    /// The record is only written back if it is already known; the selection
    /// follows when it points at the same ID.
    pub async fn fetch_one(&self, id: &str) -> Result<DeploymentRecord, ConsoleError> {
        let _flight = self.flights.try_begin(&format!("fetch_one:{}", id))?;
        let token = self.token()?;

        let record = cancellable(&self.cancel, self.http_client.get_deployment(id, &token))
            .await
            .inspect_err(|e| warn!("Fetch deployment {} error: {}", id, e))?;

        let mut state = self.write();
        state.set.replace_existing(record.clone());
        if state.selected.as_ref().is_some_and(|s| s.id == record.id) {
            state.selected = Some(record.clone());
        }
        Ok(record)
    }

    /// Fetch one record and make it the selection, as a detail view does
    pub async fn open(&self, id: &str) -> Result<DeploymentRecord, ConsoleError> {
        let record = self.fetch_one(id).await?;
        self.write().selected = Some(record.clone());
        Ok(record)
    }

    /// Plain-text log of one deployment
    pub async fn fetch_logs(&self, id: &str) -> Result<String, ConsoleError> {
        let _flight = self.flights.try_begin(&format!("logs:{}", id))?;
        let token = self.token()?;

        cancellable(&self.cancel, self.http_client.get_deployment_logs(id, &token))
            .await
            .inspect_err(|e| warn!("Fetch logs for {} error: {}", id, e))
    }

    // =============================== COMMANDS =================================== //

    /// Queue a redeploy, then resynchronise the list
    pub async fn redeploy(&self, id: &str) -> Result<RedeployResponse, ConsoleError> {
        let _flight = self.flights.try_begin(&format!("redeploy:{}", id))?;
        let token = self.token()?;

        let result = cancellable(&self.cancel, self.http_client.redeploy_deployment(id, &token)).await;
        match &result {
            Ok(resp) => info!("Redeploy of {} queued as {}", id, resp.id),
            Err(e) => error!("Redeploy error: {}", e),
        }

        self.resync(&result).await;
        result
    }

    /// Stop a deployment, then resynchronise the list
    pub async fn stop(&self, id: &str) -> Result<CommandResponse, ConsoleError> {
        let _flight = self.flights.try_begin(&format!("stop:{}", id))?;
        let token = self.token()?;

        let result = cancellable(&self.cancel, self.http_client.stop_deployment(id, &token)).await;
        match &result {
            Ok(_) => info!("Stop of {} accepted", id),
            Err(e) => error!("Stop deployment error: {}", e),
        }

        self.resync(&result).await;
        result
    }

    // Commands are never merged locally; the list is refetched whatever the
    // command returned. An outstanding fetch_all is awaited, then a fresh one runs.
    async fn resync<T>(&self, command: &Result<T, ConsoleError>) {
        if matches!(command, Err(ConsoleError::Cancelled)) {
            return;
        }
        let _flight = self.flights.begin(FETCH_ALL).await;
        if let Err(e) = self.fetch_all_locked().await {
            warn!("Resync after command failed: {}", e);
        }
    }

    // ============================= RECONCILIATION =============================== //

    /// Apply a record pushed by the server
    ///
    /// Unconditional upsert: the push channel may repeat or reorder messages,
    /// so no transition is validated. The selection follows a matching ID.
    pub fn reconcile_push(&self, record: DeploymentRecord) -> Upsert {
        let mut state = self.write();
        if state.selected.as_ref().is_some_and(|s| s.id == record.id) {
            state.selected = Some(record.clone());
        }
        let outcome = state.set.upsert(record);
        debug!("Reconciled pushed deployment: {:?}", outcome);
        outcome
    }

    // ================================ SELECTION ================================= //

    /// Select a known record; returns false for unknown IDs
    pub fn select(&self, id: &str) -> bool {
        let mut state = self.write();
        match state.set.get(id).cloned() {
            Some(record) => {
                state.selected = Some(record);
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&self) {
        self.write().selected = None;
    }

    pub fn selected(&self) -> Option<DeploymentRecord> {
        self.read().selected.clone()
    }

    // ================================ READ VIEWS ================================ //

    /// Run `f` against the current set
    pub fn with_set<R>(&self, f: impl FnOnce(&DeploymentSet) -> R) -> R {
        f(&self.read().set)
    }

    pub fn stats(&self) -> DerivedStats {
        self.read().set.stats()
    }

    pub fn len(&self) -> usize {
        self.read().set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().set.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<DeploymentRecord> {
        self.read().set.get(id).cloned()
    }

    pub fn active(&self) -> Vec<DeploymentRecord> {
        self.with_set(|set| set.active().into_iter().cloned().collect())
    }

    pub fn recent(&self) -> Vec<DeploymentRecord> {
        self.with_set(|set| set.recent(RECENT_LIMIT).into_iter().cloned().collect())
    }

    pub fn by_environment(&self) -> BTreeMap<String, Vec<DeploymentRecord>> {
        self.with_set(|set| {
            set.by_environment()
                .into_iter()
                .map(|(env, records)| (env, records.into_iter().cloned().collect()))
                .collect()
        })
    }

    /// Seven-day histogram in the local time zone
    pub fn timeline(&self) -> Vec<DailyCount> {
        let today = Local::now().date_naive();
        self.with_set(|set| set.timeline(today, &Local))
    }

    // ================================== STATUS ================================== //

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// True while a full fetch is outstanding
    pub fn loading(&self) -> bool {
        self.flights.in_flight(FETCH_ALL)
    }

    pub fn ws_connected(&self) -> bool {
        self.read().ws_connected
    }

    pub fn set_ws_connected(&self, connected: bool) {
        self.write().ws_connected = connected;
    }

    /// Abort outstanding requests; their late results are dropped
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
