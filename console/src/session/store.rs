//! Session store: login, logout and restoration of the operator session

use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::ConsoleError;
use crate::http::client::{HttpClient, LOGIN_FAILED};
use crate::router::guard::{AuthState, DEPLOYMENTS, LOGIN};
use crate::router::Router;
use crate::session::state::SessionState;
use crate::storage::local::{LocalStorage, TOKEN_KEY, USER_KEY};
use crate::sync::cancel::cancellable;
use crate::sync::single_flight::SingleFlight;

const LOGIN_ACTION: &str = "login";

pub struct SessionStore {
    state: Arc<SessionState>,
    storage: Arc<dyn LocalStorage>,
    http_client: Arc<HttpClient>,
    router: Arc<Router>,
    flights: SingleFlight,
    error: RwLock<Option<String>>,
    cancel: CancellationToken,
}

impl SessionStore {
    pub fn new(
        state: Arc<SessionState>,
        storage: Arc<dyn LocalStorage>,
        http_client: Arc<HttpClient>,
        router: Arc<Router>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state,
            storage,
            http_client,
            router,
            flights: SingleFlight::new(),
            error: RwLock::new(None),
            cancel,
        }
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn username(&self) -> Option<String> {
        self.state.username()
    }

    pub fn credential(&self) -> Option<SecretString> {
        self.state.credential()
    }

    /// True while a login request is outstanding
    pub fn busy(&self) -> bool {
        self.flights.in_flight(LOGIN_ACTION)
    }

    /// Message from the last failed login, cleared when a new one starts
    pub fn error(&self) -> Option<String> {
        self.error.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_error(&self, message: Option<String>) {
        *self.error.write().unwrap_or_else(|e| e.into_inner()) = message;
    }

    /// Sign in and enter the deployment list
    ///
    /// A second call while one is outstanding fails with [`ConsoleError::Busy`].
    pub async fn login(&self, username: &str, password: SecretString) -> Result<(), ConsoleError> {
        let _flight = self.flights.try_begin(LOGIN_ACTION)?;
        self.set_error(None);

        let result = cancellable(&self.cancel, self.http_client.login(username, &password)).await;
        let token = match result {
            Ok(token) => token,
            Err(e) => {
                let message = match &e {
                    ConsoleError::AuthError(reason) => reason.clone(),
                    _ => LOGIN_FAILED.to_string(),
                };
                warn!("Login as {} failed: {}", username, e);
                self.set_error(Some(message));
                return Err(e);
            }
        };

        // memory only follows once both entries are on disk
        if let Err(e) = self.persist(&token, username).await {
            warn!("Unable to persist session for {}: {}", username, e);
            self.state.clear();
            self.discard_persisted().await;
            self.set_error(Some(LOGIN_FAILED.to_string()));
            return Err(e);
        }
        self.state.set(token, username.to_string());
        info!("Logged in as {}", username);

        self.router.navigate(DEPLOYMENTS);
        Ok(())
    }

    async fn persist(&self, token: &SecretString, username: &str) -> Result<(), ConsoleError> {
        self.storage.set_item(TOKEN_KEY, token.expose_secret()).await?;
        self.storage.set_item(USER_KEY, username).await
    }

    /// Best effort removal of a half-written session
    async fn discard_persisted(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove_item(key).await {
                debug!("Unable to remove {}: {}", key, e);
            }
        }
    }

    /// Forget the session and return to the login view
    ///
    /// Memory is cleared and navigation happens even if the persisted entries
    /// cannot be removed; that failure is returned afterwards.
    pub async fn logout(&self) -> Result<(), ConsoleError> {
        self.state.clear();

        let removed = match self.storage.remove_item(TOKEN_KEY).await {
            Ok(()) => self.storage.remove_item(USER_KEY).await,
            Err(e) => Err(e),
        };

        self.router.navigate(LOGIN);
        info!("Logged out");
        removed
    }

    /// Load a previously persisted session, returning whether one was found
    pub async fn restore(&self) -> Result<bool, ConsoleError> {
        let token = self.storage.get_item(TOKEN_KEY).await?;
        let username = self.storage.get_item(USER_KEY).await?;

        match (token, username) {
            (Some(token), Some(username)) if !token.is_empty() && !username.is_empty() => {
                debug!("Restored session for {}", username);
                self.state.set(SecretString::from(token), username);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Abort an outstanding login; a late response is discarded
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
