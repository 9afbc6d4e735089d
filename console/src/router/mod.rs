//! Client-side routing

pub mod guard;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::router::guard::{normalize, AuthState, Navigation, RouteGuard, HOME};

/// Holds the current route and applies the guard on every navigation
///
/// The session is read inside `navigate`, in the same call that commits the
/// new route, so a concurrent login or logout is observed either fully before
/// or fully after the decision.
pub struct Router {
    guard: RouteGuard,
    auth: Arc<dyn AuthState>,
    current: watch::Sender<String>,
}

impl Router {
    pub fn new(guard: RouteGuard, auth: Arc<dyn AuthState>) -> Self {
        let (current, _) = watch::channel(HOME.to_string());
        Self {
            guard,
            auth,
            current,
        }
    }

    /// Navigate to `path`, returning the route that was actually entered
    pub fn navigate(&self, path: &str) -> String {
        let target = normalize(path).to_string();
        let resolved = match self.guard.check(&target, self.auth.as_ref()) {
            Navigation::Proceed => target,
            Navigation::Redirect(to) => {
                info!("Navigation to {} requires login, redirecting to {}", target, to);
                to
            }
        };

        debug!("Entering route {}", resolved);
        self.current.send_replace(resolved.clone());
        resolved
    }

    /// Route currently displayed
    pub fn current(&self) -> String {
        self.current.borrow().clone()
    }

    /// Observe route changes
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }
}
