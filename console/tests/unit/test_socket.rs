//! Socket worker tests against a local WebSocket server

use std::sync::Arc;
use std::time::Duration;

use dockrune_console::deployments::feed::DeploymentFeed;
use dockrune_console::live::board::LiveEvent;
use dockrune_console::models::app_status::AppStatus;
use dockrune_console::models::deployment::DeploymentStatus;
use dockrune_console::workers::socket::{self, build_socket_url, DEPLOYMENT_FEED_PATH, LIVE_PATH};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, accept_hdr_async};

use crate::common::{console, record_json, signed_in};

const INIT: &str = r#"{"type":"init","data":[
    {"name":"blog","status":"live","domain":"blog.example.com","port":3000,"log_lines":[]},
    {"name":"api","status":"deploying","domain":"api.example.com","log_lines":[]}
]}"#;

const UPDATE: &str = r#"{"type":"status_update","app_name":"api","data":
    {"name":"api","status":"failing","domain":"api.example.com","log_lines":["exit 1"]}}"#;

fn options() -> socket::Options {
    socket::Options {
        reconnect_delay: Duration::from_millis(50),
    }
}

async fn next_event(rx: &mut broadcast::Receiver<LiveEvent>) -> LiveEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a live event")
        .expect("event channel closed")
}

fn spawn_worker<H>(
    url: url::Url,
    session: Option<Arc<dockrune_console::session::state::SessionState>>,
    handler: Arc<H>,
) -> (oneshot::Sender<()>, JoinHandle<()>)
where
    H: socket::PushHandler + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        socket::run(
            &options(),
            url,
            session,
            handler,
            tokio::time::sleep,
            Box::pin(async move {
                let _ = stop_rx.await;
            }),
        )
        .await;
    });
    (stop_tx, handle)
}

#[tokio::test]
async fn test_live_board_follows_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(INIT.into())).await.unwrap();
        ws.send(Message::Text("garbage".into())).await.unwrap();
        ws.send(Message::Text(UPDATE.into())).await.unwrap();
        // hold the connection until the client goes away
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (state, _) = console(&base);
    let mut events = state.live.subscribe();
    let url = build_socket_url(&base, LIVE_PATH).unwrap();
    let (stop_tx, worker) = spawn_worker(url, None, state.live.clone());

    assert_eq!(next_event(&mut events).await, LiveEvent::Connected);
    assert_eq!(next_event(&mut events).await, LiveEvent::Snapshot { apps: 2 });
    assert_eq!(
        next_event(&mut events).await,
        LiveEvent::StatusChanged {
            name: "api".to_string(),
            from: AppStatus::Deploying,
            to: AppStatus::Failing,
        }
    );

    assert!(state.live.is_connected());
    assert!(state.live.is_loaded());
    assert_eq!(state.live.counts().failing, 1);
    assert_eq!(state.live.get("blog").unwrap().port, Some(3000));

    stop_tx.send(()).unwrap();
    worker.await.unwrap();
    assert_eq!(next_event(&mut events).await, LiveEvent::Disconnected);
    assert!(!state.live.is_connected());

    server.await.unwrap();
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        // first connection is dropped straight away
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        drop(ws);

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(INIT.into())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (state, _) = console(&base);
    let mut events = state.live.subscribe();
    let url = build_socket_url(&base, LIVE_PATH).unwrap();
    let (stop_tx, worker) = spawn_worker(url, None, state.live.clone());

    assert_eq!(next_event(&mut events).await, LiveEvent::Connected);
    assert_eq!(next_event(&mut events).await, LiveEvent::Disconnected);
    assert_eq!(next_event(&mut events).await, LiveEvent::Connected);
    assert_eq!(next_event(&mut events).await, LiveEvent::Snapshot { apps: 2 });

    stop_tx.send(()).unwrap();
    worker.await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_while_waiting_to_reconnect() {
    // nothing listens on the discard port
    let (state, _) = console("http://127.0.0.1:9");
    let url = build_socket_url("http://127.0.0.1:9", LIVE_PATH).unwrap();
    let (stop_tx, worker) = spawn_worker(url, None, state.live.clone());

    tokio::time::sleep(Duration::from_millis(120)).await;
    stop_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("worker did not stop")
        .unwrap();
    assert!(!state.live.is_connected());
}

#[tokio::test]
async fn test_deployment_feed_sends_bearer_and_reconciles() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (auth_tx, auth_rx) = oneshot::channel::<Option<String>>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            assert_eq!(req.uri().path(), DEPLOYMENT_FEED_PATH);
            let auth = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let _ = auth_tx.send(auth);
            Ok(resp)
        };
        let mut ws = accept_hdr_async(stream, callback).await.unwrap();

        let push = json!([
            record_json("a", "in_progress", "2025-03-01T10:00:00Z"),
            record_json("b", "success", "2025-03-01T09:00:00Z"),
        ]);
        ws.send(Message::Text(push.to_string().into())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let state = signed_in(&base);
    let url = build_socket_url(&base, DEPLOYMENT_FEED_PATH).unwrap();
    let feed = Arc::new(DeploymentFeed::new(state.deployments.clone()));
    let (stop_tx, worker) = spawn_worker(url, Some(state.session_state.clone()), feed);

    let auth = tokio::time::timeout(Duration::from_secs(5), auth_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer test-token"));

    let mut applied = false;
    for _ in 0..100 {
        if state.deployments.len() == 2 {
            applied = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(applied, "pushed records never reached the store");
    assert!(state.deployments.ws_connected());
    assert_eq!(state.deployments.get("a").unwrap().status, DeploymentStatus::InProgress);
    assert_eq!(state.deployments.stats().successful, 1);

    stop_tx.send(()).unwrap();
    worker.await.unwrap();
    assert!(!state.deployments.ws_connected());
    server.await.unwrap();
}
