//! WebSocket transport: the obs-websocket client connection.
//!
//! Architecture:
//! - [`ObsController`] is a cheap `Clone` handle over shared state.
//! - `connect()` spawns one session task per attempt. The task opens the
//!   socket with the `obswebsocket.json` subprotocol, starts a writer task
//!   fed by an unbounded `mpsc` channel, and runs the read loop.
//! - The read loop hands each text message to the [`FrameHandler`] in
//!   arrival order, so inbound frames are never processed concurrently.
//!   A server that goes quiet before Identified, or never finishes a close
//!   we started, is dropped after `request_timeout`.
//! - User notifications run on the blocking pool, off the read loop.
//! - When the read loop ends for any reason the session task fails all
//!   pending requests, consults the [`ReconnectPolicy`], and either spawns
//!   the next attempt or gives up and notifies the user. The next attempt
//!   only starts after the previous socket is gone.
//! - Requests go out through the same channel; their responses come back
//!   through the [`RequestCorrelator`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use valleycast_core::protocol::{close_code, encode_frame, Frame, RequestResponse, SUBPROTOCOL};
use valleycast_core::{
    ConnectionPhase, ConnectionState, ObsEvent, ReconnectDecision, ReconnectPolicy,
    RecordingStatus,
};

use crate::application::correlator::{RequestCorrelator, RequestError};
use crate::application::dispatcher::EventDispatcher;
use crate::application::frame_handler::{FrameHandler, HandlerAction};
use crate::application::notifier::Notifier;
use crate::application::recording::{ObsRequester, RecordingControl, StopPolling};
use crate::infrastructure::storage::config::AppConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors opening the socket. Never returned to callers; they end the
/// attempt and feed the reconnect policy.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server address {url}: {reason}")]
    InvalidAddress { url: String, reason: String },

    #[error("WebSocket connect failed: {0}")]
    Connect(#[from] WsError),

    #[error("WebSocket connect timed out after {0:?}")]
    TimedOut(Duration),
}

/// Messages shown to the user on connection changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionNotifications {
    pub enabled: bool,
    pub on_connect: String,
    pub on_disconnect: String,
}

/// Everything the controller needs from the settings store.
#[derive(Clone)]
pub struct ControllerConfig {
    /// `ws://host:port`
    pub url: String,
    pub password: String,
    /// Reconnect ceiling.
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    /// Bounds the socket open, the Hello/Identified handshake, the close,
    /// and each request.
    pub request_timeout: Duration,
    pub stop_polling: StopPolling,
    pub notifications: ConnectionNotifications,
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("url", &self.url)
            .field("password", &"<redacted>")
            .field("reconnect_attempts", &self.reconnect_attempts)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("request_timeout", &self.request_timeout)
            .field("stop_polling", &self.stop_polling)
            .field("notifications", &self.notifications)
            .finish()
    }
}

impl From<&AppConfig> for ControllerConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.websocket_url(),
            password: cfg.password.clone(),
            reconnect_attempts: cfg.reconnect_attempts,
            reconnect_delay: Duration::from_millis(cfg.reconnect_delay_ms),
            request_timeout: Duration::from_millis(cfg.request_timeout_ms),
            stop_polling: StopPolling {
                interval: Duration::from_millis(cfg.stop_poll_interval_ms),
                attempts: cfg.stop_poll_attempts,
            },
            notifications: ConnectionNotifications {
                enabled: cfg.enable_conn_notif,
                on_connect: cfg.conn_notif_message_connect.clone(),
                on_disconnect: cfg.conn_notif_message_disconnect.clone(),
            },
        }
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Handle to one obs-websocket connection.
///
/// `connect`, `reconnect` and `replace_settings` spawn tasks and must be
/// called from inside a Tokio runtime.
#[derive(Clone)]
pub struct ObsController {
    inner: Arc<Inner>,
}

struct Inner {
    config: ControllerConfig,
    state: Arc<Mutex<ConnectionState>>,
    phase_tx: watch::Sender<ConnectionPhase>,
    policy: Mutex<ReconnectPolicy>,
    correlator: Arc<RequestCorrelator>,
    dispatcher: Arc<EventDispatcher>,
    handler: FrameHandler,
    recording: Arc<RecordingStatus>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    notifier: Arc<dyn Notifier>,
    /// Bumped by manual reconnect and close; a scheduled retry from an
    /// older epoch is dropped.
    epoch: AtomicU64,
    closed_by_user: AtomicBool,
}

impl ObsController {
    pub fn new(config: ControllerConfig, notifier: Arc<dyn Notifier>) -> Self {
        let state = Arc::new(Mutex::new(ConnectionState::new()));
        let recording = Arc::new(RecordingStatus::new());
        let correlator = Arc::new(RequestCorrelator::new());
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&recording)));
        let handler = FrameHandler::new(
            config.password.clone(),
            Arc::clone(&state),
            Arc::clone(&correlator),
            Arc::clone(&dispatcher),
        );
        let (phase_tx, _) = watch::channel(ConnectionPhase::Disconnected);
        let policy = Mutex::new(ReconnectPolicy::new(config.reconnect_attempts));

        Self {
            inner: Arc::new(Inner {
                config,
                state,
                phase_tx,
                policy,
                correlator,
                dispatcher,
                handler,
                recording,
                outbound: Mutex::new(None),
                notifier,
                epoch: AtomicU64::new(0),
                closed_by_user: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Starts a connection attempt. A no-op unless currently disconnected.
    ///
    /// Transport failures never surface here; they close the attempt and
    /// go through the reconnect policy.
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Resets the attempt counter and connects. This is what a user-facing
    /// "Reconnect" button calls after the controller gave up.
    pub fn reconnect(&self) {
        info!("manual reconnect requested");
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.lock_policy().reset();
        self.inner.connect();
    }

    /// Closes the socket without reconnecting.
    ///
    /// [`is_connected`](Self::is_connected) turns false immediately, and new
    /// requests fail with `NotConnected`. [`phase`](Self::phase) keeps
    /// reporting the socket until the server finishes the close or
    /// `request_timeout` passes.
    pub fn close(&self) {
        self.inner.closed_by_user.store(true, Ordering::SeqCst);
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.inner.lock_outbound().as_ref() {
            let _ = tx.send(Message::Close(None));
        }
    }

    /// Closes this connection and returns a new, connecting controller built
    /// from `config`, sharing the same notifier.
    pub fn replace_settings(&self, config: ControllerConfig) -> ObsController {
        info!("settings changed; reconnecting to {}", config.url);
        self.close();
        let next = ObsController::new(config, Arc::clone(&self.inner.notifier));
        next.connect();
        next
    }

    pub fn is_connected(&self) -> bool {
        !self.inner.closed_by_user.load(Ordering::SeqCst) && self.inner.lock_state().is_connected()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.inner.lock_state().phase()
    }

    /// Observes phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<ConnectionPhase> {
        self.inner.phase_tx.subscribe()
    }

    /// Waits up to `within` for the handshake to complete.
    pub async fn wait_until_connected(&self, within: Duration) -> bool {
        let mut phase = self.watch_phase();
        let outcome = timeout(
            within,
            phase.wait_for(|p| *p == ConnectionPhase::Connected),
        )
        .await;
        matches!(outcome, Ok(Ok(_)))
    }

    /// Receives every server event decoded after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ObsEvent> {
        self.inner.dispatcher.subscribe()
    }

    pub fn recording_status(&self) -> Arc<RecordingStatus> {
        Arc::clone(&self.inner.recording)
    }

    /// Recording operations issued over this connection.
    pub fn recording(&self) -> RecordingControl {
        RecordingControl::new(
            Arc::new(self.clone()),
            self.recording_status(),
            self.inner.config.stop_polling,
        )
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.correlator.pending_count()
    }
}

#[async_trait]
impl ObsRequester for ObsController {
    async fn send_request(
        &self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> Result<RequestResponse, RequestError> {
        if !self.is_connected() {
            return Err(RequestError::NotConnected);
        }

        let inner = &self.inner;
        let (request, rx) = inner.correlator.register(request_type, request_data);
        let request_id = request.request_id.clone();
        if let Err(e) = inner.send_frame(&Frame::Request(request)) {
            inner.correlator.remove(&request_id);
            return Err(e);
        }

        match timeout(inner.config.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RequestError::Disconnected(
                "request abandoned before a response arrived".to_string(),
            )),
            Err(_) => {
                inner.correlator.remove(&request_id);
                warn!(
                    "{request_type} request {request_id} timed out after {:?}",
                    inner.config.request_timeout
                );
                Err(RequestError::TimedOut {
                    request_type: request_type.to_string(),
                    after: inner.config.request_timeout,
                })
            }
        }
    }
}

// ── Session task ──────────────────────────────────────────────────────────────

impl Inner {
    fn connect(self: &Arc<Self>) {
        if let Err(e) = self.lock_state().begin_connect() {
            debug!("connect ignored: {e}");
            return;
        }
        self.closed_by_user.store(false, Ordering::SeqCst);
        self.publish_phase();

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.run_session().await;
        });
    }

    async fn run_session(self: Arc<Self>) {
        info!("connecting to OBS at {}", self.config.url);

        let close = match self.open_socket().await {
            Ok(ws) => self.drive(ws).await,
            Err(e) => {
                error!("OBS WebSocket error: {e}");
                None
            }
        };

        if let Some(frame) = close {
            let code = u16::from(frame.code);
            warn!(
                "OBS closed the connection with code {code} ({}){}",
                close_code::describe(code),
                if frame.reason.is_empty() {
                    String::new()
                } else {
                    format!(": {}", frame.reason)
                }
            );
        }

        self.on_closed().await;
    }

    async fn open_socket(&self) -> Result<WsStream, TransportError> {
        let mut request = self.config.url.as_str().into_client_request().map_err(|e| {
            TransportError::InvalidAddress {
                url: self.config.url.clone(),
                reason: e.to_string(),
            }
        })?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

        let (ws, _response) = timeout(self.config.request_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::TimedOut(self.config.request_timeout))??;
        debug!("socket open to {}", self.config.url);
        Ok(ws)
    }

    /// Runs the read loop until the socket ends. Returns the server's close
    /// frame, if it sent one.
    ///
    /// The handshake must reach Identified within `request_timeout` of the
    /// socket opening, and once our Close has gone out the server has the
    /// same budget to finish the close. Missing either deadline drops the
    /// socket, which hands the session to the reconnect policy.
    async fn drive(&self, ws: WsStream) -> Option<CloseFrame<'static>> {
        let (mut sink, mut stream) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        *self.lock_outbound() = Some(tx.clone());
        // close() may have run before the sender was installed.
        if self.closed_by_user.load(Ordering::SeqCst) {
            debug!("close requested while the socket was opening");
            let _ = tx.send(Message::Close(None));
        }
        drop(tx);

        let mut writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    debug!("socket write failed: {e}");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let handshake_deadline = Instant::now() + self.config.request_timeout;
        let mut close_deadline: Option<Instant> = None;
        let mut close_frame = None;
        loop {
            let handshaking = !self.lock_state().is_connected();
            let deadline = match close_deadline {
                Some(at) => Some(at),
                None if handshaking => Some(handshake_deadline),
                None => None,
            };

            let next = tokio::select! {
                next = stream.next() => next,
                _ = &mut writer, if close_deadline.is_none() => {
                    close_deadline = Some(Instant::now() + self.config.request_timeout);
                    continue;
                }
                _ = sleep_until(deadline) => {
                    if close_deadline.is_some() {
                        warn!("OBS did not finish the close within {:?}", self.config.request_timeout);
                    } else {
                        warn!(
                            "OBS did not complete the handshake within {:?}",
                            self.config.request_timeout
                        );
                    }
                    break;
                }
            };

            let Some(message) = next else { break };
            match message {
                Ok(Message::Text(text)) => self.handle_text(&text),
                Ok(Message::Close(frame)) => close_frame = frame,
                Ok(Message::Binary(_)) => debug!("ignoring binary message from OBS"),
                Ok(_) => {}
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => break,
                Err(e) => {
                    error!("OBS WebSocket error: {e}");
                    break;
                }
            }
        }

        self.lock_outbound().take();
        writer.abort();
        close_frame
    }

    fn handle_text(&self, text: &str) {
        match self.handler.handle_text(text) {
            HandlerAction::None => {}
            HandlerAction::Send(frame) => {
                if let Err(e) = self.send_frame(&frame) {
                    warn!("failed to send {}: {e}", frame.op_code());
                }
            }
            HandlerAction::Identified { .. } => self.on_identified(),
        }
        self.publish_phase();
    }

    fn on_identified(&self) {
        self.lock_policy().on_connected();
        let notifications = &self.config.notifications;
        if notifications.enabled {
            self.notify_user(&notifications.on_connect);
        }
    }

    /// Hands `message` to the notifier on the blocking pool, so a notifier
    /// that waits on the user never stalls the read loop.
    fn notify_user(&self, message: &str) {
        let notifier = Arc::clone(&self.notifier);
        let message = message.to_string();
        tokio::task::spawn_blocking(move || notifier.notify(&message));
    }

    async fn on_closed(self: Arc<Self>) {
        self.lock_outbound().take();
        let previous = self.lock_state().closed();
        self.publish_phase();
        self.correlator.fail_all("connection to OBS closed");
        warn!("OBS WebSocket connection closed (was {previous})");

        if self.closed_by_user.load(Ordering::SeqCst) {
            info!("not reconnecting: connection closed on request");
            return;
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let decision = self.lock_policy().on_disconnected();
        match decision {
            ReconnectDecision::Retry { attempt, ceiling } => {
                warn!("attempting to reconnect to OBS... (attempt {attempt}/{ceiling})");
                tokio::time::sleep(self.config.reconnect_delay).await;
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    debug!("scheduled reconnect superseded");
                    return;
                }
                self.connect();
            }
            ReconnectDecision::GiveUp { ceiling } => {
                error!("failed to reconnect to OBS after {ceiling} attempts");
                let notifications = &self.config.notifications;
                if notifications.enabled {
                    self.notify_user(&notifications.on_disconnect);
                }
            }
        }
    }

    fn send_frame(&self, frame: &Frame) -> Result<(), RequestError> {
        let text = encode_frame(frame).map_err(|e| RequestError::Send(e.to_string()))?;
        let outbound = self.lock_outbound();
        let tx = outbound.as_ref().ok_or(RequestError::NotConnected)?;
        tx.send(Message::Text(text))
            .map_err(|_| RequestError::Disconnected("socket writer stopped".to_string()))
    }

    fn publish_phase(&self) {
        let phase = self.lock_state().phase();
        self.phase_tx.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_policy(&self) -> MutexGuard<'_, ReconnectPolicy> {
        self.policy.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Message>>> {
        self.outbound.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
