//! Route guard applied before every navigation

/// Login view
pub const LOGIN: &str = "/login";

/// Landing page, home of the live app board
pub const HOME: &str = "/";

/// Deployment list, the main view after login
pub const DEPLOYMENTS: &str = "/deployments";

/// Detail view for one deployment
pub fn deployment_detail(id: &str) -> String {
    format!("{}/{}", DEPLOYMENTS, id)
}

/// Something that knows whether an operator is signed in
pub trait AuthState: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Outcome of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

/// Allow-list guard: public paths always pass, everything else needs a session
#[derive(Debug, Clone)]
pub struct RouteGuard {
    public_paths: Vec<String>,
    login_path: String,
}

impl RouteGuard {
    pub fn new(public_paths: Vec<String>, login_path: impl Into<String>) -> Self {
        Self {
            public_paths,
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Decide whether navigation to `path` may proceed
    pub fn check(&self, path: &str, auth: &dyn AuthState) -> Navigation {
        let path = normalize(path);
        if self.public_paths.iter().any(|p| p == path) || auth.is_authenticated() {
            Navigation::Proceed
        } else {
            Navigation::Redirect(self.login_path.clone())
        }
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(vec![LOGIN.to_string(), HOME.to_string()], LOGIN)
    }
}

/// Path part only, without query or fragment
pub fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() {
        HOME
    } else {
        path
    }
}
