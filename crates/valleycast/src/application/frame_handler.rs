//! FrameHandler: drives the Hello → Identify → Identified handshake and
//! routes post-handshake frames to the correlator or the dispatcher.
//!
//! The handler is synchronous and owns no socket. The transport feeds it
//! each inbound text message in arrival order and carries out the returned
//! [`HandlerAction`], which keeps the whole handshake testable without I/O.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use valleycast_core::protocol::{
    compute_auth_response, decode_frame, Frame, Hello, Identified, Identify, RPC_VERSION,
};
use valleycast_core::{ConnectionPhase, ConnectionState};

use crate::application::correlator::RequestCorrelator;
use crate::application::dispatcher::EventDispatcher;

/// What the transport must do after a frame was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerAction {
    /// Nothing to send.
    None,
    /// Send this frame to the server.
    Send(Frame),
    /// The session just became usable.
    Identified { negotiated_rpc_version: u32 },
}

pub struct FrameHandler {
    password: String,
    state: Arc<Mutex<ConnectionState>>,
    correlator: Arc<RequestCorrelator>,
    dispatcher: Arc<EventDispatcher>,
}

impl FrameHandler {
    pub fn new(
        password: String,
        state: Arc<Mutex<ConnectionState>>,
        correlator: Arc<RequestCorrelator>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            password,
            state,
            correlator,
            dispatcher,
        }
    }

    /// Decodes and handles one text message.
    ///
    /// Unparseable text is logged and dropped; the connection stays up.
    pub fn handle_text(&self, text: &str) -> HandlerAction {
        match decode_frame(text) {
            Ok(frame) => self.handle_frame(frame),
            Err(e) => {
                warn!("dropping frame from OBS: {e}");
                HandlerAction::None
            }
        }
    }

    pub fn handle_frame(&self, frame: Frame) -> HandlerAction {
        let phase = self.lock_state().phase();
        match (frame, phase) {
            (Frame::Hello(hello), _) => self.on_hello(hello),
            (Frame::Identified(identified), _) => self.on_identified(identified),
            (Frame::RequestResponse(response), ConnectionPhase::Connected) => {
                self.correlator.resolve(response);
                HandlerAction::None
            }
            (Frame::Event(event), ConnectionPhase::Connected) => {
                self.dispatcher.dispatch(event);
                HandlerAction::None
            }
            (other, phase) => {
                warn!("unexpected {} while {phase}; ignoring", other.op_code());
                HandlerAction::None
            }
        }
    }

    fn on_hello(&self, hello: Hello) -> HandlerAction {
        if let Err(e) = self.lock_state().hello_received() {
            warn!("ignoring Hello: {e}");
            return HandlerAction::None;
        }

        info!(
            "received Hello from obs-websocket {}",
            hello.obs_web_socket_version.as_deref().unwrap_or("(unknown version)")
        );

        let authentication = hello.authentication.map(|auth| {
            info!("OBS WebSocket requires authentication");
            if self.password.is_empty() {
                warn!("OBS asked for a password but none is configured; identifying with an empty one");
            }
            compute_auth_response(&self.password, &auth.salt, &auth.challenge)
        });

        let rpc_version = hello.rpc_version.min(RPC_VERSION);
        debug!("identifying with rpc version {rpc_version}");

        HandlerAction::Send(Frame::Identify(Identify {
            rpc_version,
            authentication,
            event_subscriptions: None,
        }))
    }

    fn on_identified(&self, identified: Identified) -> HandlerAction {
        if let Err(e) = self.lock_state().identified() {
            warn!("ignoring Identified: {e}");
            return HandlerAction::None;
        }
        info!(
            "OBS WebSocket successfully identified (rpc version {})",
            identified.negotiated_rpc_version
        );
        HandlerAction::Identified {
            negotiated_rpc_version: identified.negotiated_rpc_version,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use valleycast_core::protocol::{
        AuthChallenge, ObsEvent, RecordStateChanged, RequestResponse, RequestStatus,
    };
    use valleycast_core::RecordingStatus;

    struct Harness {
        handler: FrameHandler,
        state: Arc<Mutex<ConnectionState>>,
        correlator: Arc<RequestCorrelator>,
        recording: Arc<RecordingStatus>,
    }

    fn harness(password: &str) -> Harness {
        let state = Arc::new(Mutex::new(ConnectionState::new()));
        state.lock().unwrap().begin_connect().unwrap();
        let correlator = Arc::new(RequestCorrelator::new());
        let recording = Arc::new(RecordingStatus::new());
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&recording)));
        let handler = FrameHandler::new(
            password.to_string(),
            Arc::clone(&state),
            Arc::clone(&correlator),
            dispatcher,
        );
        Harness {
            handler,
            state,
            correlator,
            recording,
        }
    }

    fn hello(authentication: Option<AuthChallenge>) -> Frame {
        Frame::Hello(Hello {
            obs_web_socket_version: Some("5.4.2".to_string()),
            rpc_version: 1,
            authentication,
        })
    }

    fn identify_connected(h: &Harness) {
        h.handler.handle_frame(hello(None));
        h.handler.handle_frame(Frame::Identified(Identified {
            negotiated_rpc_version: 1,
        }));
    }

    #[test]
    fn test_hello_without_auth_sends_identify_without_authentication() {
        // Arrange
        let h = harness("ignored");

        // Act
        let action = h.handler.handle_frame(hello(None));

        // Assert
        assert_eq!(
            action,
            HandlerAction::Send(Frame::Identify(Identify {
                rpc_version: 1,
                authentication: None,
                event_subscriptions: None,
            }))
        );
        assert_eq!(
            h.state.lock().unwrap().phase(),
            ConnectionPhase::AwaitingIdentified
        );
    }

    #[test]
    fn test_hello_with_challenge_sends_computed_authentication() {
        // Arrange
        let h = harness("supersecretpassword");
        let challenge = AuthChallenge {
            challenge: "+IxH4CnCiqpX1rM9scsNynZzbOe4KhDeYcTNS3PDaeY=".to_string(),
            salt: "lM1GncleQOaCu9lT1yeUZhFYnqhsLLP1G5lAGo3ixaI=".to_string(),
        };

        // Act
        let action = h.handler.handle_frame(hello(Some(challenge)));

        // Assert
        let HandlerAction::Send(Frame::Identify(identify)) = action else {
            panic!("expected Identify");
        };
        assert_eq!(
            identify.authentication.as_deref(),
            Some("1Ct943GAT+6YQUUX47Ia/ncufilbe6+oD6lY+5kaCu4=")
        );
    }

    #[test]
    fn test_newer_server_rpc_version_is_negotiated_down() {
        let h = harness("");
        let action = h.handler.handle_frame(Frame::Hello(Hello {
            obs_web_socket_version: None,
            rpc_version: 3,
            authentication: None,
        }));
        let HandlerAction::Send(Frame::Identify(identify)) = action else {
            panic!("expected Identify");
        };
        assert_eq!(identify.rpc_version, RPC_VERSION);
    }

    #[test]
    fn test_identified_after_hello_reports_identified() {
        let h = harness("");
        h.handler.handle_frame(hello(None));

        let action = h.handler.handle_frame(Frame::Identified(Identified {
            negotiated_rpc_version: 1,
        }));

        assert_eq!(
            action,
            HandlerAction::Identified {
                negotiated_rpc_version: 1
            }
        );
        assert!(h.state.lock().unwrap().is_connected());
    }

    #[test]
    fn test_identified_before_hello_is_ignored() {
        let h = harness("");
        let action = h.handler.handle_frame(Frame::Identified(Identified {
            negotiated_rpc_version: 1,
        }));
        assert_eq!(action, HandlerAction::None);
        assert_eq!(h.state.lock().unwrap().phase(), ConnectionPhase::AwaitingHello);
    }

    #[test]
    fn test_event_before_identified_is_ignored() {
        // Arrange
        let h = harness("");
        h.handler.handle_frame(hello(None));

        // Act
        let action = h.handler.handle_frame(Frame::Event(ObsEvent::RecordStateChanged(
            RecordStateChanged {
                output_active: true,
                output_state: "OBS_WEBSOCKET_OUTPUT_STARTED".to_string(),
                output_path: None,
            },
        )));

        // Assert
        assert_eq!(action, HandlerAction::None);
        assert_eq!(h.recording.known(), None);
    }

    #[test]
    fn test_unsolicited_record_event_updates_cache_without_touching_correlator() {
        // Arrange
        let h = harness("");
        identify_connected(&h);
        let (_request, _rx) = h.correlator.register("GetRecordStatus", None);

        // Act
        let text = json!({
            "op": 5,
            "d": {
                "eventType": "RecordStateChanged",
                "eventIntent": 64,
                "eventData": { "outputActive": true, "outputState": "OBS_WEBSOCKET_OUTPUT_STARTED" }
            }
        })
        .to_string();
        h.handler.handle_text(&text);

        // Assert
        assert_eq!(h.recording.known(), Some(true));
        assert_eq!(h.correlator.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_request_response_is_routed_to_correlator() {
        let h = harness("");
        identify_connected(&h);
        let (request, rx) = h.correlator.register("StartRecord", None);

        h.handler.handle_frame(Frame::RequestResponse(RequestResponse {
            request_type: "StartRecord".to_string(),
            request_id: request.request_id.clone(),
            request_status: RequestStatus::success(),
            response_data: None,
        }));

        assert!(rx.await.unwrap().is_ok());
    }

    #[test]
    fn test_garbage_text_is_dropped() {
        let h = harness("");
        identify_connected(&h);

        assert_eq!(h.handler.handle_text("{not json"), HandlerAction::None);
        assert_eq!(h.handler.handle_text(r#"{"op":42,"d":{}}"#), HandlerAction::None);
        assert!(h.state.lock().unwrap().is_connected());
    }
}
