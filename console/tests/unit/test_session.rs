//! Session store tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dockrune_console::app::state::ConsoleState;
use dockrune_console::errors::ConsoleError;
use dockrune_console::router::guard::{DEPLOYMENTS, HOME, LOGIN};
use dockrune_console::storage::local::{LocalStorage, MemoryStorage, TOKEN_KEY, USER_KEY};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{console, options, persist_session};

fn password(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

/// Takes the credential but runs out of space for the username
#[derive(Default)]
struct FullDisk {
    inner: MemoryStorage,
}

#[async_trait]
impl LocalStorage for FullDisk {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ConsoleError> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ConsoleError> {
        if key == USER_KEY {
            return Err(ConsoleError::StorageError("disk full".to_string()));
        }
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), ConsoleError> {
        self.inner.remove_item(key).await
    }
}

#[tokio::test]
async fn test_login_persists_and_enters_deployments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/login"))
        .and(body_json(json!({"username": "admin", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let (state, storage) = console(&server.uri());
    assert_ok!(state.session.login("admin", password("hunter2")).await);

    assert!(state.session.is_authenticated());
    assert_eq!(state.session.username().as_deref(), Some("admin"));
    assert_eq!(state.session.credential().unwrap().expose_secret(), "abc123");
    assert!(state.session.error().is_none());
    assert!(!state.session.busy());

    assert_eq!(storage.get_item(TOKEN_KEY).await.unwrap().as_deref(), Some("abc123"));
    assert_eq!(storage.get_item(USER_KEY).await.unwrap().as_deref(), Some("admin"));
    assert_eq!(state.router.current(), DEPLOYMENTS);
}

#[tokio::test]
async fn test_login_failure_uses_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let (state, storage) = console(&server.uri());
    let err = assert_err!(state.session.login("admin", password("wrong")).await);

    assert!(err.is_auth());
    assert_eq!(state.session.error().as_deref(), Some("Invalid credentials"));
    assert!(!state.session.is_authenticated());
    assert!(storage.is_empty().await);
    assert_eq!(state.router.current(), HOME);
}

#[tokio::test]
async fn test_login_failure_without_payload_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let (state, _) = console(&server.uri());
    assert_err!(state.session.login("admin", password("pw")).await);
    assert_eq!(state.session.error().as_deref(), Some("Login failed"));
}

#[tokio::test]
async fn test_login_transport_failure_defaults() {
    // nothing listens on the discard port
    let (state, _) = console("http://127.0.0.1:9");
    let err = assert_err!(state.session.login("admin", password("pw")).await);
    assert!(matches!(err, ConsoleError::HttpError(_)));
    assert_eq!(state.session.error().as_deref(), Some("Login failed"));
}

#[tokio::test]
async fn test_login_unpersisted_session_stays_signed_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc"})))
        .mount(&server)
        .await;

    let storage = Arc::new(FullDisk::default());
    let state = ConsoleState::with_storage(&options(&server.uri()), storage.clone()).unwrap();

    let err = assert_err!(state.session.login("admin", password("pw")).await);
    assert!(matches!(err, ConsoleError::StorageError(_)));
    assert!(!state.session.is_authenticated());
    assert!(state.session.credential().is_none());
    assert_eq!(state.session.error().as_deref(), Some("Login failed"));
    assert_eq!(state.router.current(), HOME);

    // the credential written before the failure is rolled back
    assert!(storage.inner.is_empty().await);
    assert!(!state.session.restore().await.unwrap());
}

#[tokio::test]
async fn test_new_login_clears_previous_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "nope"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
        .mount(&server)
        .await;

    let (state, _) = console(&server.uri());
    assert_err!(state.session.login("admin", password("a")).await);
    assert_eq!(state.session.error().as_deref(), Some("nope"));

    assert_ok!(state.session.login("admin", password("b")).await);
    assert!(state.session.error().is_none());
}

#[tokio::test]
async fn test_second_login_while_outstanding_is_busy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "slow"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (state, _) = console(&server.uri());
    let session = &state.session;

    let (first, second) = tokio::join!(session.login("admin", password("pw")), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.busy());
        session.login("admin", password("pw")).await
    });

    assert_ok!(first);
    assert!(matches!(second, Err(ConsoleError::Busy(_))));
    assert!(!session.busy());
}

#[tokio::test]
async fn test_login_after_shutdown_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "late"}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let (state, storage) = console(&server.uri());
    let (result, _) = tokio::join!(state.session.login("admin", password("pw")), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        state.shutdown();
    });

    assert!(matches!(result, Err(ConsoleError::Cancelled)));
    assert!(!state.session.is_authenticated());
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_restore_requires_both_entries() {
    let (state, storage) = console("http://127.0.0.1:9");

    // nothing persisted
    assert!(!state.session.restore().await.unwrap());
    assert!(!state.session.is_authenticated());

    storage.set_item(TOKEN_KEY, "abc").await.unwrap();
    assert!(!state.session.restore().await.unwrap());
    assert!(!state.session.is_authenticated());

    storage.set_item(USER_KEY, "admin").await.unwrap();
    assert!(state.session.restore().await.unwrap());
    assert!(state.session.is_authenticated());
    assert_eq!(state.session.username().as_deref(), Some("admin"));
}

#[tokio::test]
async fn test_restore_is_idempotent() {
    let (state, storage) = console("http://127.0.0.1:9");
    persist_session(storage.as_ref(), "abc", "admin").await;

    assert!(state.session.restore().await.unwrap());
    let first = state.session_state.snapshot();
    assert!(state.session.restore().await.unwrap());
    let second = state.session_state.snapshot();

    assert_eq!(first.username, second.username);
    assert_eq!(
        first.credential.unwrap().expose_secret(),
        second.credential.unwrap().expose_secret()
    );
    assert_eq!(storage.len().await, 2);
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let (state, storage) = console("http://127.0.0.1:9");
    persist_session(storage.as_ref(), "abc", "admin").await;
    assert!(state.session.restore().await.unwrap());
    state.router.navigate(DEPLOYMENTS);

    assert_ok!(state.session.logout().await);

    assert!(!state.session.is_authenticated());
    assert!(state.session.username().is_none());
    assert!(storage.is_empty().await);
    assert_eq!(state.router.current(), LOGIN);

    // a guarded route is now refused
    assert_eq!(state.router.navigate(DEPLOYMENTS), LOGIN);
}
