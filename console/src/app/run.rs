//! Watch mode run loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::options::ConsoleOptions;
use crate::app::state::ConsoleState;
use crate::deployments::feed::DeploymentFeed;
use crate::errors::ConsoleError;
use crate::workers::socket::{self, build_socket_url, DEPLOYMENT_FEED_PATH, LIVE_PATH};

/// Follow the live channel until `shutdown_signal` resolves
///
/// The deployment feed is followed too when a session is present and
/// `options.follow_deployments` is set. Observers subscribe to
/// [`crate::live::dashboard::LiveDashboard::subscribe`] before calling this.
pub async fn run(
    options: &ConsoleOptions,
    state: Arc<ConsoleState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ConsoleError> {
    info!("Starting watch mode...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(
        shutdown_tx.clone(),
        state.clone(),
        options.max_shutdown_delay,
    );

    if let Err(e) = init(options, &state, &shutdown_tx, &mut shutdown_manager) {
        error!("Failed to start watch mode: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

fn init(
    options: &ConsoleOptions,
    state: &Arc<ConsoleState>,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), ConsoleError> {
    init_live_worker(options, state, shutdown_manager, shutdown_tx.subscribe())?;

    if options.follow_deployments {
        if state.session.is_authenticated() {
            init_feed_worker(options, state, shutdown_manager, shutdown_tx.subscribe())?;
        } else {
            warn!("Not logged in, deployment feed disabled");
        }
    }

    Ok(())
}

fn init_live_worker(
    options: &ConsoleOptions,
    state: &Arc<ConsoleState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ConsoleError> {
    info!("Initializing live worker...");

    let url = build_socket_url(&options.api_base_url, LIVE_PATH)?;
    let worker_options = options.live_worker.clone();
    let handler = state.live.clone();

    let handle = tokio::spawn(async move {
        socket::run(
            &worker_options,
            url,
            None,
            handler,
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_live_worker_handle(handle)
}

fn init_feed_worker(
    options: &ConsoleOptions,
    state: &Arc<ConsoleState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ConsoleError> {
    info!("Initializing deployment feed worker...");

    let url = build_socket_url(&options.api_base_url, DEPLOYMENT_FEED_PATH)?;
    let worker_options = options.live_worker.clone();
    let session = state.session_state.clone();
    let handler = Arc::new(DeploymentFeed::new(state.deployments.clone()));

    let handle = tokio::spawn(async move {
        socket::run(
            &worker_options,
            url,
            Some(session),
            handler,
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_feed_worker_handle(handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    state: Arc<ConsoleState>,
    max_shutdown_delay: Duration,
    live_worker_handle: Option<JoinHandle<()>>,
    feed_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new(
        shutdown_tx: broadcast::Sender<()>,
        state: Arc<ConsoleState>,
        max_shutdown_delay: Duration,
    ) -> Self {
        Self {
            shutdown_tx,
            state,
            max_shutdown_delay,
            live_worker_handle: None,
            feed_worker_handle: None,
        }
    }

    pub fn with_live_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), ConsoleError> {
        if self.live_worker_handle.is_some() {
            return Err(ConsoleError::ShutdownError("live_worker_handle already set".to_string()));
        }
        self.live_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_feed_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), ConsoleError> {
        if self.feed_worker_handle.is_some() {
            return Err(ConsoleError::ShutdownError("feed_worker_handle already set".to_string()));
        }
        self.feed_worker_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), ConsoleError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(self.max_shutdown_delay, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, aborting workers...",
                    self.max_shutdown_delay
                );
                for handle in [self.live_worker_handle.take(), self.feed_worker_handle.take()]
                    .into_iter()
                    .flatten()
                {
                    handle.abort();
                }
                self.state.shutdown();
                Err(ConsoleError::ShutdownError("shutdown timed out".to_string()))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), ConsoleError> {
        info!("Shutting down watch mode...");

        // 1. Live worker
        if let Some(handle) = self.live_worker_handle.take() {
            handle.await.map_err(|e| ConsoleError::ShutdownError(e.to_string()))?;
        }

        // 2. Deployment feed worker
        if let Some(handle) = self.feed_worker_handle.take() {
            handle.await.map_err(|e| ConsoleError::ShutdownError(e.to_string()))?;
        }

        // 3. Outstanding requests
        self.state.shutdown();

        info!("Shutdown complete");
        Ok(())
    }
}
