//! Live dashboard command tests

use std::time::Duration;

use dockrune_console::errors::ConsoleError;
use dockrune_console::live::dashboard::CommandAck;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::console;

#[tokio::test]
async fn test_deploy_posts_app_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/apps/blog/deploy"))
        .and(body_json(json!({"app_name": "blog"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let (state, _) = console(&server.uri());
    let ack = assert_ok!(state.live.deploy("blog").await);
    assert_eq!(ack, CommandAck::Accepted);

    // the board only changes through the live channel
    assert!(state.live.apps().is_empty());
}

#[tokio::test]
async fn test_stop_sends_no_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/apps/blog/stop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "stopping"})))
        .expect(1)
        .mount(&server)
        .await;

    let (state, _) = console(&server.uri());
    assert_eq!(assert_ok!(state.live.stop("blog").await), CommandAck::Accepted);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_server_rejection_is_an_ack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/apps/ghost/deploy"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "App not found"})))
        .mount(&server)
        .await;

    let (state, _) = console(&server.uri());
    match assert_ok!(state.live.deploy("ghost").await) {
        CommandAck::Rejected(reason) => assert!(reason.contains("App not found")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_same_app_command_is_single_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/apps/blog/deploy"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/apps/api/deploy"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (state, _) = console(&server.uri());
    let live = &state.live;
    let (first, second, other) = tokio::join!(
        live.deploy("blog"),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            live.deploy("blog").await
        },
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            live.deploy("api").await
        }
    );

    assert_eq!(assert_ok!(first), CommandAck::Accepted);
    assert!(matches!(second, Err(ConsoleError::Busy(_))));
    assert_eq!(assert_ok!(other), CommandAck::Accepted);
}
