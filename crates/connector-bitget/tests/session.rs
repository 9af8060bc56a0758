//! Session behaviour against a local WebSocket server.

use auth::ApiCredentials;
use common::TradingMode;
use connector_bitget::StreamingSession;
use connector_core::{ConnectorError, SessionConfig, SessionState};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

const DATA_PUSH: &str = r#"{"action":"snapshot","arg":{"instType":"SUSDT-FUTURES","channel":"orders","instId":"default"},"data":[{"orderId":"1001","instId":"SBTCSUSDT","side":"buy","status":"filled","price":"39800","size":"0.0025"}],"ts":1738000000000}"#;

/// How the fake exchange behaves.
#[derive(Default)]
struct Script {
    reject_login: bool,
    /// Every login after the first on the same connection is refused.
    reject_relogin: bool,
    /// First connection is dropped right after its subscribe ack.
    drop_first_after_subscribe: bool,
    /// First connection acks login and subscribe, then never answers again.
    silent_first_connection: bool,
    /// Frames pushed after every subscribe ack (not on a silent connection).
    after_subscribe: Vec<String>,
    /// Frame pushed once, after the first subscribe ack.
    once_after_subscribe: Option<String>,
}

#[derive(Default)]
struct Counters {
    connections: AtomicUsize,
    logins: AtomicUsize,
    subscribes: AtomicUsize,
    pings: AtomicUsize,
    once_sent: AtomicBool,
}

struct MockServer {
    url: String,
    counters: Arc<Counters>,
}

impl MockServer {
    async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let counters = Arc::new(Counters::default());
        let script = Arc::new(script);

        let accept_counters = counters.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let index = accept_counters.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, index, script.clone(), accept_counters.clone()));
            }
        });

        Self { url, counters }
    }

    fn connections(&self) -> usize {
        self.counters.connections.load(Ordering::SeqCst)
    }

    fn logins(&self) -> usize {
        self.counters.logins.load(Ordering::SeqCst)
    }

    fn subscribes(&self) -> usize {
        self.counters.subscribes.load(Ordering::SeqCst)
    }

    fn pings(&self) -> usize {
        self.counters.pings.load(Ordering::SeqCst)
    }
}

async fn serve(stream: TcpStream, index: usize, script: Arc<Script>, counters: Arc<Counters>) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut tx, mut rx) = ws.split();
    let silent = script.silent_first_connection && index == 0;
    let mut logins_here = 0;

    while let Some(Ok(message)) = rx.next().await {
        let Message::Text(text) = message else {
            continue;
        };

        if text == "ping" {
            counters.pings.fetch_add(1, Ordering::SeqCst);
            if !silent {
                let _ = tx.send(Message::Text("pong".into())).await;
            }
            continue;
        }

        let request: Value = serde_json::from_str(&text).unwrap();
        match request["op"].as_str() {
            Some("login") => {
                counters.logins.fetch_add(1, Ordering::SeqCst);
                let arg = &request["args"][0];
                assert_eq!(arg["apiKey"], "key");
                assert_eq!(arg["passphrase"], "pass");
                assert!(!arg["sign"].as_str().unwrap().is_empty());

                logins_here += 1;
                let reply = if script.reject_login || (script.reject_relogin && logins_here > 1) {
                    r#"{"event":"error","code":30012,"msg":"Invalid ACCESS_PASSPHRASE"}"#
                } else {
                    r#"{"event":"login","code":0}"#
                };
                let _ = tx.send(Message::Text(reply.into())).await;
            }
            Some("subscribe") => {
                counters.subscribes.fetch_add(1, Ordering::SeqCst);
                let arg = &request["args"][0];
                assert_eq!(arg["channel"], "orders");
                assert_eq!(arg["instId"], "default");

                let ack = serde_json::json!({ "event": "subscribe", "arg": arg }).to_string();
                let _ = tx.send(Message::Text(ack)).await;

                if script.drop_first_after_subscribe && index == 0 {
                    return;
                }
                if silent {
                    continue;
                }
                if let Some(frame) = &script.once_after_subscribe {
                    if !counters.once_sent.swap(true, Ordering::SeqCst) {
                        let _ = tx.send(Message::Text(frame.clone())).await;
                    }
                }
                for frame in &script.after_subscribe {
                    let _ = tx.send(Message::Text(frame.clone())).await;
                }
            }
            _ => {}
        }
    }
}

fn credentials() -> ApiCredentials {
    ApiCredentials::new("key".into(), "secret".into(), "pass".into())
}

fn fast_config(url: &str) -> SessionConfig {
    SessionConfig::new(url)
        .with_heartbeat_interval(Duration::from_secs(30))
        .with_idle_timeout(Duration::from_secs(30))
        .with_liveness_check_interval(Duration::from_millis(20))
        .with_reconnect_delay(Duration::from_millis(50))
        .with_login_timeout(Duration::from_secs(2))
}

fn session(config: SessionConfig) -> StreamingSession {
    StreamingSession::new(config, credentials(), TradingMode::Demo, metrics::create_metrics())
}

fn collecting_handler(session: &StreamingSession) -> mpsc::UnboundedReceiver<Vec<u8>> {
    let (tx, rx) = mpsc::unbounded_channel();
    session.register_handler(move |payload| {
        let _ = tx.send(payload);
    });
    rx
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

async fn next_payload(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Value {
    let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no payload within timeout")
        .expect("handler channel closed");
    serde_json::from_slice(&payload).unwrap()
}

#[tokio::test]
async fn test_open_logs_in_subscribes_and_forwards_data() {
    let server = MockServer::start(Script {
        after_subscribe: vec![DATA_PUSH.to_string()],
        ..Default::default()
    })
    .await;
    let session = session(fast_config(&server.url));
    let mut payloads = collecting_handler(&session);

    session.open().await.unwrap();
    assert_eq!(session.state(), SessionState::Live);

    let batch = next_payload(&mut payloads).await;
    assert_eq!(batch[0]["orderId"], "1001");
    assert_eq!(batch[0]["status"], "filled");

    assert_eq!(server.connections(), 1);
    assert_eq!(server.logins(), 1);
    assert!(wait_until(|| server.subscribes() == 1).await);
    assert_eq!(session.metrics().batches_forwarded(), 1);

    session.close().await;
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_rejected_login_is_auth_error() {
    let server = MockServer::start(Script {
        reject_login: true,
        ..Default::default()
    })
    .await;
    let session = session(fast_config(&server.url));

    let err = session.open().await.unwrap_err();
    assert!(matches!(err, ConnectorError::Auth(_)), "got {:?}", err);
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(server.subscribes(), 0);
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let session = session(fast_config(&url));
    let err = session.open().await.unwrap_err();
    assert!(matches!(err, ConnectorError::Connection(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_second_open_is_rejected() {
    let server = MockServer::start(Script::default()).await;
    let session = session(fast_config(&server.url));

    session.open().await.unwrap();
    assert!(matches!(session.open().await, Err(ConnectorError::AlreadyOpen)));
    assert_eq!(server.connections(), 1);

    session.close().await;
}

#[tokio::test]
async fn test_silent_connection_is_replaced_exactly_once() {
    let server = MockServer::start(Script {
        silent_first_connection: true,
        after_subscribe: vec![DATA_PUSH.to_string()],
        ..Default::default()
    })
    .await;

    // Heartbeat timeout and idle timeout expire at about the same time on
    // the silent connection; only one replacement may result.
    let config = fast_config(&server.url)
        .with_heartbeat_interval(Duration::from_millis(100))
        .with_pong_timeout(Duration::from_millis(200))
        .with_idle_timeout(Duration::from_millis(300));
    let session = session(config);
    let mut payloads = collecting_handler(&session);

    session.open().await.unwrap();
    assert_eq!(server.connections(), 1);

    assert!(wait_until(|| server.connections() == 2 && server.subscribes() == 2).await);
    let batch = next_payload(&mut payloads).await;
    assert_eq!(batch[0]["orderId"], "1001");
    assert!(wait_until(|| session.state() == SessionState::Live).await);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(server.connections(), 2);
    assert_eq!(server.logins(), 2);
    assert_eq!(server.subscribes(), 2);
    assert_eq!(session.metrics().reconnect_successes(), 1);

    session.close().await;
}

#[tokio::test]
async fn test_heartbeat_sends_ping() {
    let server = MockServer::start(Script::default()).await;
    let config = fast_config(&server.url).with_heartbeat_interval(Duration::from_millis(50));
    let session = session(config);

    session.open().await.unwrap();
    assert!(wait_until(|| server.pings() >= 3).await);
    assert!(session.metrics().heartbeats_sent() >= 3);
    assert_eq!(server.connections(), 1);
    assert_eq!(session.state(), SessionState::Live);

    session.close().await;
}

#[tokio::test]
async fn test_not_logged_in_triggers_relogin_without_reconnect() {
    let server = MockServer::start(Script {
        once_after_subscribe: Some(
            r#"{"event":"error","code":30004,"msg":"User not logged in"}"#.to_string(),
        ),
        ..Default::default()
    })
    .await;
    let session = session(fast_config(&server.url));

    session.open().await.unwrap();
    assert!(wait_until(|| server.logins() == 2).await);
    assert_eq!(server.connections(), 1);
    assert_eq!(session.metrics().reauthentications(), 1);

    session.close().await;
}

#[tokio::test]
async fn test_too_many_requests_triggers_resubscribe() {
    let server = MockServer::start(Script {
        once_after_subscribe: Some(
            r#"{"event":"error","code":30006,"msg":"request too many"}"#.to_string(),
        ),
        ..Default::default()
    })
    .await;
    let session = session(fast_config(&server.url));

    session.open().await.unwrap();
    assert!(wait_until(|| server.subscribes() == 2).await);
    assert_eq!(server.connections(), 1);
    assert_eq!(server.logins(), 1);
    assert_eq!(session.metrics().resubscriptions(), 1);

    session.close().await;
}

#[tokio::test]
async fn test_malformed_and_error_frames_are_not_forwarded() {
    let server = MockServer::start(Script {
        after_subscribe: vec![
            "{not json".to_string(),
            r#"{"event":"error","code":30001,"msg":"channel does not exist"}"#.to_string(),
            DATA_PUSH.to_string(),
        ],
        ..Default::default()
    })
    .await;
    let session = session(fast_config(&server.url));
    let mut payloads = collecting_handler(&session);

    session.open().await.unwrap();

    let batch = next_payload(&mut payloads).await;
    assert_eq!(batch[0]["instId"], "SBTCSUSDT");
    assert_eq!(session.metrics().parse_errors(), 1);
    assert!(payloads.try_recv().is_err());

    session.close().await;
}

#[tokio::test]
async fn test_no_reconnect_after_close() {
    let server = MockServer::start(Script::default()).await;
    let config = fast_config(&server.url).with_idle_timeout(Duration::from_millis(100));
    let session = session(config);

    session.open().await.unwrap();
    session.close().await;
    session.close().await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connections(), 1);
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_state_transitions_are_observable() {
    let server = MockServer::start(Script::default()).await;
    let session = session(fast_config(&server.url));
    let mut states = session.subscribe_state();
    assert_eq!(*states.borrow_and_update(), SessionState::Disconnected);

    session.open().await.unwrap();
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), SessionState::Live);

    session.close().await;
    assert_eq!(*states.borrow_and_update(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_rejected_relogin_reconnects() {
    let server = MockServer::start(Script {
        reject_relogin: true,
        once_after_subscribe: Some(
            r#"{"event":"error","code":30004,"msg":"User not logged in"}"#.to_string(),
        ),
        ..Default::default()
    })
    .await;
    let session = session(fast_config(&server.url));

    session.open().await.unwrap();
    assert!(wait_until(|| server.connections() == 2 && server.subscribes() == 2).await);
    assert!(wait_until(|| session.state() == SessionState::Live).await);

    assert_eq!(server.logins(), 3);
    assert_eq!(session.metrics().reauthentications(), 1);
    assert_eq!(session.metrics().reconnect_successes(), 1);

    session.close().await;
}

#[tokio::test]
async fn test_dropped_connection_with_idle_timer_is_replaced_once() {
    let server = MockServer::start(Script {
        drop_first_after_subscribe: true,
        after_subscribe: vec![DATA_PUSH.to_string()],
        ..Default::default()
    })
    .await;

    // The read side sees the drop while the idle timer is close to expiring.
    let config = fast_config(&server.url)
        .with_heartbeat_interval(Duration::from_millis(50))
        .with_pong_timeout(Duration::from_millis(200))
        .with_idle_timeout(Duration::from_millis(150));
    let session = session(config);
    let mut payloads = collecting_handler(&session);

    session.open().await.unwrap();

    assert!(wait_until(|| server.connections() == 2 && server.subscribes() == 2).await);
    let batch = next_payload(&mut payloads).await;
    assert_eq!(batch[0]["orderId"], "1001");
    assert!(wait_until(|| session.state() == SessionState::Live).await);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.connections(), 2);
    assert_eq!(server.subscribes(), 2);
    assert_eq!(session.metrics().reconnect_successes(), 1);
    assert_eq!(session.state(), SessionState::Live);

    session.close().await;
}
