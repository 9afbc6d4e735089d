//! In-memory session

use std::sync::RwLock;

use secrecy::SecretString;

use crate::router::guard::AuthState;

/// Bearer credential and display name of the signed-in operator
#[derive(Debug, Default, Clone)]
pub struct Session {
    pub credential: Option<SecretString>,
    pub username: Option<String>,
}

/// Shared session cell
///
/// A plain `RwLock` so the route guard can read it synchronously.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<Session>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Session {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn credential(&self) -> Option<SecretString> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .credential
            .clone()
    }

    pub fn username(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .username
            .clone()
    }

    pub fn set(&self, credential: SecretString, username: String) {
        let mut session = self.inner.write().unwrap_or_else(|e| e.into_inner());
        session.credential = Some(credential);
        session.username = Some(username);
    }

    pub fn clear(&self) {
        let mut session = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *session = Session::default();
    }
}

impl AuthState for SessionState {
    fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .credential
            .is_some()
    }
}
