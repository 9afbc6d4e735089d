//! Console state: every store constructed once and shared by `Arc`

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::options::ConsoleOptions;
use crate::deployments::store::DeploymentStore;
use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::live::dashboard::LiveDashboard;
use crate::router::guard::RouteGuard;
use crate::router::Router;
use crate::session::state::SessionState;
use crate::session::store::SessionStore;
use crate::storage::local::{FileStorage, LocalStorage};

/// Main console state
pub struct ConsoleState {
    /// HTTP client for the admin API
    pub http_client: Arc<HttpClient>,

    /// Session cell read by the route guard and the stores
    pub session_state: Arc<SessionState>,

    pub router: Arc<Router>,

    pub session: Arc<SessionStore>,

    pub deployments: Arc<DeploymentStore>,

    pub live: Arc<LiveDashboard>,

    /// Parent of every store's cancellation token
    cancel: CancellationToken,
}

impl ConsoleState {
    /// Initialize console state backed by the on-disk local storage
    pub fn init(options: &ConsoleOptions) -> Result<Self, ConsoleError> {
        let storage: Arc<dyn LocalStorage> =
            Arc::new(FileStorage::new(options.layout.local_storage_file()));
        Self::with_storage(options, storage)
    }

    /// Initialize console state over any local storage
    pub fn with_storage(
        options: &ConsoleOptions,
        storage: Arc<dyn LocalStorage>,
    ) -> Result<Self, ConsoleError> {
        info!("Initializing console state for {}...", options.api_base_url);

        let cancel = CancellationToken::new();
        let http_client = Arc::new(HttpClient::new(
            &options.api_base_url,
            options.request_timeout,
        )?);

        let session_state = Arc::new(SessionState::new());
        let router = Arc::new(Router::new(RouteGuard::default(), session_state.clone()));

        let session = Arc::new(SessionStore::new(
            session_state.clone(),
            storage,
            http_client.clone(),
            router.clone(),
            cancel.child_token(),
        ));

        let deployments = Arc::new(DeploymentStore::new(
            http_client.clone(),
            session_state.clone(),
            cancel.child_token(),
        ));

        let live = Arc::new(LiveDashboard::new(http_client.clone(), cancel.child_token()));

        Ok(Self {
            http_client,
            session_state,
            router,
            session,
            deployments,
            live,
            cancel,
        })
    }

    /// Cancel every outstanding request; late results are discarded
    pub fn shutdown(&self) {
        info!("Shutting down console state...");
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
