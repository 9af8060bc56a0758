//! Long-lived authenticated session on the private WebSocket.

use crate::frame::{classify_frame, login_frame, subscribe_frame, InboundFrame, PING};
use auth::ApiCredentials;
use common::{ExponentialBackoff, TradingMode};
use connector_core::{ConnectorError, PayloadHandler, SessionConfig, SessionState};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use metrics::SharedMetrics;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Why a live connection was given up.
#[derive(Debug)]
enum DegradeReason {
    Idle { silent_secs: f64 },
    HeartbeatTimeout,
    HeartbeatSendFailed(String),
    LoginRejected(String),
    ReadError(String),
    ClosedByServer,
    StreamEnded,
}

impl std::fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle { silent_secs } => write!(f, "no frames for {:.1}s", silent_secs),
            Self::HeartbeatTimeout => write!(f, "heartbeat not answered"),
            Self::HeartbeatSendFailed(e) => write!(f, "heartbeat send failed: {}", e),
            Self::LoginRejected(e) => write!(f, "login rejected: {}", e),
            Self::ReadError(e) => write!(f, "read error: {}", e),
            Self::ClosedByServer => write!(f, "closed by server"),
            Self::StreamEnded => write!(f, "stream ended"),
        }
    }
}

/// Degradation reported by a timer task for a specific connection.
#[derive(Debug)]
struct Degradation {
    generation: u64,
    reason: DegradeReason,
}

/// Outcome of handling one inbound message.
enum Flow {
    Continue,
    Degraded(DegradeReason),
}

/// The write half and the connected flag, behind one lock.
struct Link {
    sink: Option<WsSink>,
}

struct SessionInner {
    config: SessionConfig,
    credentials: ApiCredentials,
    mode: TradingMode,
    link: tokio::sync::Mutex<Link>,
    /// Bumped every time a connection goes live.
    generation: AtomicU64,
    handler: RwLock<Option<PayloadHandler>>,
    last_received: Mutex<Instant>,
    /// When the oldest unanswered `ping` was sent.
    pending_pong: Mutex<Option<Instant>>,
    /// A re-login was sent on the live connection and not yet answered.
    relogin_pending: AtomicBool,
    reconnecting: AtomicBool,
    opened: AtomicBool,
    state_tx: watch::Sender<SessionState>,
    shutdown_tx: watch::Sender<bool>,
    degrade_tx: mpsc::UnboundedSender<Degradation>,
    degrade_rx: Mutex<Option<mpsc::UnboundedReceiver<Degradation>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    metrics: SharedMetrics,
}

/// Authenticated, subscribed, self-healing connection to the `orders` feed.
///
/// Three tasks run once the session is open: the driver (reads frames and
/// owns reconnection), the heartbeat sender and the liveness monitor. The
/// timer tasks never reconnect themselves; they report a degradation tagged
/// with the connection generation and the driver acts on it, so reports about
/// a connection that was already replaced are dropped.
pub struct StreamingSession {
    inner: Arc<SessionInner>,
}

impl StreamingSession {
    pub fn new(
        config: SessionConfig,
        credentials: ApiCredentials,
        mode: TradingMode,
        metrics: SharedMetrics,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        let (shutdown_tx, _) = watch::channel(false);
        let (degrade_tx, degrade_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(SessionInner {
                config,
                credentials,
                mode,
                link: tokio::sync::Mutex::new(Link { sink: None }),
                generation: AtomicU64::new(0),
                handler: RwLock::new(None),
                last_received: Mutex::new(Instant::now()),
                pending_pong: Mutex::new(None),
                relogin_pending: AtomicBool::new(false),
                reconnecting: AtomicBool::new(false),
                opened: AtomicBool::new(false),
                state_tx,
                shutdown_tx,
                degrade_tx,
                degrade_rx: Mutex::new(Some(degrade_rx)),
                tasks: Mutex::new(Vec::new()),
                metrics,
            }),
        }
    }

    /// Install the consumer of data payloads, replacing any previous one.
    pub fn register_handler<F>(&self, handler: F)
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        let previous = self.inner.handler.write().replace(Arc::new(handler));
        if previous.is_some() {
            debug!("Replaced payload handler");
        }
    }

    /// Connect, log in and subscribe, then start the background tasks.
    ///
    /// # Errors
    /// `Connection` if the transport cannot be established, `Auth` if the
    /// login is rejected, `AlreadyOpen` on a second call, `Shutdown` after
    /// `close`.
    pub async fn open(&self) -> Result<(), ConnectorError> {
        if *self.inner.shutdown_tx.borrow() {
            return Err(ConnectorError::Shutdown);
        }
        if self.inner.opened.swap(true, Ordering::SeqCst) {
            return Err(ConnectorError::AlreadyOpen);
        }

        let read = match self.inner.establish().await {
            Ok(read) => read,
            Err(e) => {
                self.inner.opened.store(false, Ordering::SeqCst);
                self.inner.set_state(SessionState::Disconnected);
                return Err(e);
            }
        };

        let degrade_rx = self
            .inner
            .degrade_rx
            .lock()
            .take()
            .ok_or(ConnectorError::AlreadyOpen)?;

        let driver = tokio::spawn(run_driver(
            self.inner.clone(),
            read,
            degrade_rx,
            self.inner.shutdown_tx.subscribe(),
        ));
        let heartbeat = tokio::spawn(run_heartbeat(
            self.inner.clone(),
            self.inner.shutdown_tx.subscribe(),
        ));
        let liveness = tokio::spawn(run_liveness(
            self.inner.clone(),
            self.inner.shutdown_tx.subscribe(),
        ));
        self.inner.tasks.lock().extend([driver, heartbeat, liveness]);

        info!(url = %self.inner.config.url, mode = %self.inner.mode, "Streaming session live");
        Ok(())
    }

    /// Stop the background tasks and close the transport. Idempotent.
    pub async fn close(&self) {
        if self.inner.shutdown_tx.send_replace(true) {
            return;
        }

        let tasks = std::mem::take(&mut *self.inner.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }

        self.inner.close_link().await;
        self.inner.set_state(SessionState::Disconnected);
        info!("Streaming session closed");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.inner.state_tx.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn metrics(&self) -> SharedMetrics {
        self.inner.metrics.clone()
    }

    pub fn mode(&self) -> TradingMode {
        self.inner.mode
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        self.inner.shutdown_tx.send_replace(true);
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("url", &self.inner.config.url)
            .field("mode", &self.inner.mode)
            .field("state", &self.state())
            .finish()
    }
}

/// Clears the in-flight reconnect flag when dropped.
struct ReconnectGuard<'a>(&'a AtomicBool);

impl Drop for ReconnectGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionInner {
    fn set_state(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Session state changed");
        }
    }

    fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    fn touch(&self) {
        *self.last_received.lock() = Instant::now();
        self.metrics.inc_frames_received();
    }

    /// Report that the live connection looks dead.
    ///
    /// Only the first report per connection moves the state; the driver
    /// drops reports for replaced connections.
    fn degrade(&self, generation: u64, reason: DegradeReason) {
        if self.state() != SessionState::Live || self.reconnecting.load(Ordering::SeqCst) {
            return;
        }
        self.set_state(SessionState::Degraded);
        let _ = self.degrade_tx.send(Degradation { generation, reason });
    }

    fn begin_reconnect(&self) -> Option<ReconnectGuard<'_>> {
        self.reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ReconnectGuard(&self.reconnecting))
    }

    /// Connect, log in and subscribe. On success the new write half is
    /// installed and the read half returned.
    async fn establish(&self) -> Result<WsSource, ConnectorError> {
        self.set_state(SessionState::Connecting);

        let (stream, _) =
            match tokio::time::timeout(self.config.connect_timeout, connect_async(&self.config.url))
                .await
            {
                Ok(Ok(connected)) => connected,
                Ok(Err(e)) => return Err(ConnectorError::Connection(e.to_string())),
                Err(_) => return Err(ConnectorError::Connection("connection timeout".into())),
            };
        let (mut sink, mut read) = stream.split();

        self.set_state(SessionState::Authenticating);
        let login = login_frame(&self.credentials, &unix_secs());
        sink.send(Message::Text(login))
            .await
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;

        match tokio::time::timeout(self.config.login_timeout, await_login(&mut sink, &mut read))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ConnectorError::Connection(
                    "login acknowledgement timed out".into(),
                ))
            }
        }
        debug!("Login acknowledged");

        self.set_state(SessionState::Subscribing);
        sink.send(Message::Text(subscribe_frame(self.mode.inst_type())))
            .await
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;

        self.link.lock().await.sink = Some(sink);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.last_received.lock() = Instant::now();
        *self.pending_pong.lock() = None;
        self.relogin_pending.store(false, Ordering::SeqCst);
        self.set_state(SessionState::Live);

        info!(inst_type = %self.mode.inst_type(), "Logged in and subscribed to orders");
        Ok(read)
    }

    /// Replace a dead connection. Retries with a fixed delay until it
    /// succeeds; returns `None` if shutdown is requested first.
    async fn reconnect(
        &self,
        reason: DegradeReason,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Option<WsSource> {
        self.set_state(SessionState::Degraded);
        warn!(reason = %reason, "Session degraded, reconnecting");
        self.close_link().await;

        let mut backoff = ExponentialBackoff::fixed(self.config.reconnect_delay);

        loop {
            if self.is_shutting_down() {
                return None;
            }
            self.metrics.inc_reconnect_attempts();

            let attempt = tokio::select! {
                result = self.establish() => result,
                _ = shutdown_rx.changed() => return None,
            };

            match attempt {
                Ok(read) => {
                    self.metrics.inc_reconnect_successes();
                    info!(attempts = backoff.attempt() + 1, "Reconnected");
                    return Some(read);
                }
                Err(e) => {
                    self.metrics.inc_transport_errors();
                    let delay = backoff.next_delay();
                    warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Reconnect failed");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                return None;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn close_link(&self) {
        let sink = self.link.lock().await.sink.take();
        if let Some(mut sink) = sink {
            if let Err(e) = sink.close().await {
                debug!(error = %e, "Error closing transport");
            }
        }
    }

    async fn send_text(&self, text: String) -> Result<(), ConnectorError> {
        let mut link = self.link.lock().await;
        match link.sink.as_mut() {
            Some(sink) => sink
                .send(Message::Text(text))
                .await
                .map_err(|e| ConnectorError::Connection(e.to_string())),
            None => Err(ConnectorError::Connection("not connected".into())),
        }
    }

    async fn handle_message(
        &self,
        message: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) -> Flow {
        match message {
            Some(Ok(Message::Text(text))) => {
                self.touch();
                self.handle_text(&text).await
            }
            Some(Ok(Message::Ping(data))) => {
                self.touch();
                let mut link = self.link.lock().await;
                if let Some(sink) = link.sink.as_mut() {
                    if let Err(e) = sink.send(Message::Pong(data)).await {
                        self.metrics.inc_transport_errors();
                        return Flow::Degraded(DegradeReason::ReadError(e.to_string()));
                    }
                }
                Flow::Continue
            }
            Some(Ok(Message::Close(frame))) => {
                info!(frame = ?frame, "WebSocket closed by server");
                Flow::Degraded(DegradeReason::ClosedByServer)
            }
            Some(Ok(_)) => {
                self.touch();
                Flow::Continue
            }
            Some(Err(e)) => {
                self.metrics.inc_transport_errors();
                Flow::Degraded(DegradeReason::ReadError(e.to_string()))
            }
            None => Flow::Degraded(DegradeReason::StreamEnded),
        }
    }

    async fn handle_text(&self, text: &str) -> Flow {
        debug!(frame = %text, "Frame received");

        let frame = match classify_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.metrics.inc_parse_errors();
                warn!(error = %e, frame = %text, "Dropping malformed frame");
                return Flow::Continue;
            }
        };

        match frame {
            InboundFrame::Pong => {
                *self.pending_pong.lock() = None;
            }
            InboundFrame::LoginAck => {
                self.relogin_pending.store(false, Ordering::SeqCst);
                info!("Login acknowledged");
            }
            InboundFrame::LoginRejected { code, message } => {
                error!(code, message = %message, "Login rejected on live connection");
                self.relogin_pending.store(false, Ordering::SeqCst);
                return Flow::Degraded(DegradeReason::LoginRejected(format!(
                    "{}: {}",
                    code, message
                )));
            }
            InboundFrame::Subscribed { inst_type, channel } => {
                info!(inst_type = %inst_type, channel = %channel, "Subscribed");
            }
            InboundFrame::NotLoggedIn => {
                warn!("Server reports session not logged in, logging in again");
                self.metrics.inc_reauthentications();
                self.relogin_pending.store(true, Ordering::SeqCst);
                let login = login_frame(&self.credentials, &unix_secs());
                if let Err(e) = self.send_text(login).await {
                    return Flow::Degraded(DegradeReason::ReadError(e.to_string()));
                }
            }
            InboundFrame::TooManyRequests => {
                warn!("Server throttled a request, subscribing again");
                self.metrics.inc_resubscriptions();
                let subscribe = subscribe_frame(self.mode.inst_type());
                if let Err(e) = self.send_text(subscribe).await {
                    return Flow::Degraded(DegradeReason::ReadError(e.to_string()));
                }
            }
            InboundFrame::ServerError { code, message } => {
                // Bitget answers a bad login with an error event, not a login event.
                if self.relogin_pending.swap(false, Ordering::SeqCst) {
                    error!(code, message = %message, "Re-login rejected");
                    return Flow::Degraded(DegradeReason::LoginRejected(format!(
                        "{}: {}",
                        code, message
                    )));
                }
                warn!(code, message = %message, "Server error event");
            }
            InboundFrame::Data(payload) => self.dispatch(payload),
            InboundFrame::Ignored => {}
        }

        Flow::Continue
    }

    fn dispatch(&self, payload: Vec<u8>) {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => {
                self.metrics.inc_batches_forwarded();
                handler(payload);
            }
            None => warn!(bytes = payload.len(), "No handler registered, dropping payload"),
        }
    }
}

/// Read until the login is answered. Heartbeat replies and server pings may
/// arrive first.
async fn await_login(sink: &mut WsSink, read: &mut WsSource) -> Result<(), ConnectorError> {
    while let Some(message) = read.next().await {
        match message.map_err(|e| ConnectorError::Connection(e.to_string()))? {
            Message::Text(text) => match classify_frame(&text) {
                Ok(InboundFrame::LoginAck) => return Ok(()),
                Ok(InboundFrame::LoginRejected { code, message })
                | Ok(InboundFrame::ServerError { code, message }) => {
                    return Err(ConnectorError::Auth(format!("{}: {}", code, message)));
                }
                Ok(other) => debug!(frame = ?other, "Frame before login acknowledgement"),
                Err(e) => debug!(error = %e, "Malformed frame before login acknowledgement"),
            },
            Message::Ping(data) => {
                sink.send(Message::Pong(data))
                    .await
                    .map_err(|e| ConnectorError::Connection(e.to_string()))?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(ConnectorError::Connection(
        "connection closed during login".into(),
    ))
}

/// Reads frames and owns reconnection.
async fn run_driver(
    inner: Arc<SessionInner>,
    mut read: WsSource,
    mut degrade_rx: mpsc::UnboundedReceiver<Degradation>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let reason = tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    debug!("Driver stopping");
                    return;
                }
                continue;
            }

            Some(report) = degrade_rx.recv() => {
                let current = inner.generation.load(Ordering::SeqCst);
                if report.generation != current {
                    debug!(
                        reported = report.generation,
                        current,
                        reason = %report.reason,
                        "Ignoring degradation of a replaced connection"
                    );
                    continue;
                }
                report.reason
            }

            message = read.next() => match inner.handle_message(message).await {
                Flow::Continue => continue,
                Flow::Degraded(reason) => reason,
            },
        };

        if inner.is_shutting_down() {
            return;
        }

        let Some(_guard) = inner.begin_reconnect() else {
            debug!("Reconnect already in progress");
            continue;
        };

        match inner.reconnect(reason, &mut shutdown_rx).await {
            Some(new_read) => read = new_read,
            None => return,
        }
    }
}

/// Sends `ping` on a fixed interval while the connection is live.
async fn run_heartbeat(inner: Arc<SessionInner>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(inner.config.heartbeat_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return;
                }
            }
            _ = interval.tick() => {}
        }

        if inner.state() != SessionState::Live {
            continue;
        }
        let generation = inner.generation.load(Ordering::SeqCst);

        // A write stuck behind a full socket holds the link lock; bound it.
        let sent =
            tokio::time::timeout(inner.config.pong_timeout, inner.send_text(PING.to_string()))
                .await;
        match sent {
            Ok(Ok(())) => {
                inner.pending_pong.lock().get_or_insert_with(Instant::now);
                inner.metrics.inc_heartbeats_sent();
                debug!("Sent ping");
            }
            Ok(Err(e)) => {
                inner.metrics.inc_transport_errors();
                inner.degrade(generation, DegradeReason::HeartbeatSendFailed(e.to_string()));
            }
            Err(_) => {
                inner.metrics.inc_transport_errors();
                inner.degrade(
                    generation,
                    DegradeReason::HeartbeatSendFailed("write timed out".into()),
                );
            }
        }
    }
}

/// Watches for silence and unanswered heartbeats.
async fn run_liveness(inner: Arc<SessionInner>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(inner.config.liveness_check_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return;
                }
            }
            _ = interval.tick() => {}
        }

        if inner.state() != SessionState::Live {
            continue;
        }
        let generation = inner.generation.load(Ordering::SeqCst);

        let silent = inner.last_received.lock().elapsed();
        if silent > inner.config.idle_timeout {
            inner.degrade(
                generation,
                DegradeReason::Idle {
                    silent_secs: silent.as_secs_f64(),
                },
            );
            continue;
        }

        let pong_overdue = inner
            .pending_pong
            .lock()
            .is_some_and(|sent| sent.elapsed() > inner.config.pong_timeout);
        if pong_overdue {
            inner.degrade(generation, DegradeReason::HeartbeatTimeout);
        }
    }
}

/// Login timestamps are Unix seconds, unlike the millisecond REST header.
fn unix_secs() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session() -> StreamingSession {
        StreamingSession::new(
            SessionConfig::new("ws://127.0.0.1:9"),
            ApiCredentials::new("key".into(), "secret".into(), "pass".into()),
            TradingMode::Demo,
            metrics::create_metrics(),
        )
    }

    #[test]
    fn test_unix_secs() {
        let ts = unix_secs();
        assert_eq!(ts.len(), 10);
    }

    #[test]
    fn test_degradation_only_from_live() {
        let session = session();
        let inner = &session.inner;

        inner.degrade(0, DegradeReason::HeartbeatTimeout);
        assert_eq!(session.state(), SessionState::Disconnected);

        inner.set_state(SessionState::Live);
        inner.degrade(1, DegradeReason::Idle { silent_secs: 51.0 });
        inner.degrade(1, DegradeReason::HeartbeatTimeout);
        assert_eq!(session.state(), SessionState::Degraded);

        let mut rx = inner.degrade_rx.lock().take().unwrap();
        let first = rx.try_recv().unwrap();
        assert_eq!(first.generation, 1);
        assert!(matches!(first.reason, DegradeReason::Idle { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reconnect_guard_is_exclusive() {
        let session = session();
        let inner = &session.inner;

        let guard = inner.begin_reconnect();
        assert!(guard.is_some());
        assert!(inner.begin_reconnect().is_none());

        drop(guard);
        assert!(inner.begin_reconnect().is_some());
    }

    #[test]
    fn test_dispatch_without_handler_drops_payload() {
        let session = session();
        session.inner.dispatch(b"[]".to_vec());
        assert_eq!(session.metrics().batches_forwarded(), 0);
    }

    #[test]
    fn test_register_handler_replaces_previous() {
        let session = session();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let first = hits.clone();
        session.register_handler(move |_| first.lock().push("first"));
        let second = hits.clone();
        session.register_handler(move |_| second.lock().push("second"));

        session.inner.dispatch(b"[]".to_vec());
        assert_eq!(*hits.lock(), vec!["second"]);
        assert_eq!(session.metrics().batches_forwarded(), 1);
    }

    #[tokio::test]
    async fn test_open_fails_without_server() {
        let session = StreamingSession::new(
            SessionConfig::new("ws://127.0.0.1:1").with_login_timeout(Duration::from_millis(200)),
            ApiCredentials::new("key".into(), "secret".into(), "pass".into()),
            TradingMode::Live,
            metrics::create_metrics(),
        );

        let err = session.open().await.unwrap_err();
        assert!(matches!(err, ConnectorError::Connection(_)));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let session = session();
        session.close().await;
        session.close().await;

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(session.open().await, Err(ConnectorError::Shutdown)));
    }

    #[tokio::test]
    async fn test_login_rejected_on_live_connection_degrades() {
        let session = session();
        let flow = session
            .inner
            .handle_text(r#"{"event":"login","code":30012,"msg":"Invalid ACCESS_PASSPHRASE"}"#)
            .await;
        assert!(matches!(flow, Flow::Degraded(DegradeReason::LoginRejected(_))));
    }

    #[tokio::test]
    async fn test_error_after_relogin_degrades_once() {
        let session = session();
        let inner = &session.inner;
        let error = r#"{"event":"error","code":30012,"msg":"Invalid ACCESS_PASSPHRASE"}"#;

        assert!(matches!(inner.handle_text(error).await, Flow::Continue));

        inner.relogin_pending.store(true, Ordering::SeqCst);
        assert!(matches!(
            inner.handle_text(error).await,
            Flow::Degraded(DegradeReason::LoginRejected(_))
        ));
        assert!(matches!(inner.handle_text(error).await, Flow::Continue));

        inner.relogin_pending.store(true, Ordering::SeqCst);
        assert!(matches!(
            inner.handle_text(r#"{"event":"login","code":0}"#).await,
            Flow::Continue
        ));
        assert!(matches!(inner.handle_text(error).await, Flow::Continue));
    }

    #[tokio::test]
    async fn test_stuck_heartbeat_write_degrades() {
        let session = StreamingSession::new(
            SessionConfig::new("ws://127.0.0.1:9")
                .with_heartbeat_interval(Duration::from_millis(20))
                .with_pong_timeout(Duration::from_millis(50)),
            ApiCredentials::new("key".into(), "secret".into(), "pass".into()),
            TradingMode::Demo,
            metrics::create_metrics(),
        );
        let inner = session.inner.clone();
        inner.set_state(SessionState::Live);
        let mut rx = inner.degrade_rx.lock().take().unwrap();

        // Hold the write half as a blocked send would.
        let link = inner.link.lock().await;
        let heartbeat = tokio::spawn(run_heartbeat(inner.clone(), inner.shutdown_tx.subscribe()));

        let report = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no degradation reported")
            .unwrap();
        assert!(matches!(report.reason, DegradeReason::HeartbeatSendFailed(_)));
        assert_eq!(session.state(), SessionState::Degraded);
        assert_eq!(session.metrics().transport_errors(), 1);
        assert_eq!(session.metrics().heartbeats_sent(), 0);

        drop(link);
        let _ = inner.shutdown_tx.send(true);
        heartbeat.await.unwrap();
    }
}
