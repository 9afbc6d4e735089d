//! WebSocket push worker with a fixed-delay reconnect loop

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use http::header::{AUTHORIZATION, USER_AGENT};
use http::HeaderValue;
use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::errors::ConsoleError;
use crate::session::state::SessionState;

/// Path of the live app channel
pub const LIVE_PATH: &str = "/ws";

/// Path of the authenticated deployment feed
pub const DEPLOYMENT_FEED_PATH: &str = "/api/ws";

/// Receives what arrives on a push connection
pub trait PushHandler: Send + Sync {
    fn on_open(&self);

    fn on_text(&self, text: &str);

    /// Called once per ended attempt, whether it connected or not
    fn on_close(&self);
}

/// Socket worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay before every reconnect attempt; there is no backoff and no limit
    pub reconnect_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

/// Keep one connection to `url` open until shutdown
///
/// The loop is strictly sequential, so at most one reconnect timer is ever
/// pending. When `session` is given, its current credential is sent as a
/// bearer header on every attempt.
pub async fn run<H, S, F>(
    options: &Options,
    url: Url,
    session: Option<Arc<SessionState>>,
    handler: Arc<H>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    H: PushHandler + ?Sized,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Socket worker for {} starting...", url);

    loop {
        let request = match build_request(&url, session.as_deref()) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to build socket request: {}", e);
                return;
            }
        };

        debug!("Connecting to {}", url);
        let connection = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Socket worker shutting down...");
                return;
            }
            connection = connect_async(request) => connection,
        };

        match connection {
            Ok((mut ws_stream, _)) => {
                info!("Connected to {}", url);
                handler.on_open();

                loop {
                    tokio::select! {
                        _ = &mut shutdown_signal => {
                            info!("Socket worker closing connection...");
                            let _ = ws_stream.close(None).await;
                            handler.on_close();
                            return;
                        }
                        msg = ws_stream.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    handler.on_text(&text);
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    warn!("Server closed connection");
                                    break;
                                }
                                Some(Err(e)) => {
                                    error!("Socket error: {}", e);
                                    break;
                                }
                                Some(Ok(_)) => {}
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", url, e);
            }
        }

        handler.on_close();
        info!("Reconnecting in {:?}...", options.reconnect_delay);

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Socket worker shutting down...");
                return;
            }
            _ = sleep_fn(options.reconnect_delay) => {}
        }
    }
}

fn build_request(url: &Url, session: Option<&SessionState>) -> Result<Request, ConsoleError> {
    let mut request = url.as_str().into_client_request()?;
    let headers = request.headers_mut();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("dockrune-console/", env!("CARGO_PKG_VERSION"))),
    );

    if let Some(token) = session.and_then(|s| s.credential()) {
        let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| ConsoleError::AuthError("Credential is not a valid header".to_string()))?;
        headers.insert(AUTHORIZATION, value);
    }

    Ok(request)
}

/// Socket URL for `path` on the API host, mirroring the HTTP scheme
pub fn build_socket_url(base_url: &str, path: &str) -> Result<Url, ConsoleError> {
    let mut url = Url::parse(base_url)?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConsoleError::ConfigError(format!(
                "Unsupported API URL scheme: {}",
                other
            )))
        }
    };

    url.set_scheme(scheme)
        .map_err(|_| ConsoleError::ConfigError("Failed to set scheme".to_string()))?;
    url.set_path(&format!("{}{}", url.path().trim_end_matches('/'), path));
    url.set_query(None);

    Ok(url)
}
