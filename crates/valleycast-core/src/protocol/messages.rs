//! obs-websocket v5 message payloads.
//!
//! Every frame on the wire is a JSON object `{"op": <opcode>, "d": <payload>}`.
//! This module defines the opcode table and one struct per payload shape.
//! Field names follow the protocol's camelCase; serde renames them so the Rust
//! side can use snake_case.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Protocol constants ────────────────────────────────────────────────────────

/// The RPC version this client implements.
pub const RPC_VERSION: u32 = 1;

/// WebSocket subprotocol announced in the upgrade request.
pub const SUBPROTOCOL: &str = "obswebsocket.json";

// ── Opcodes ───────────────────────────────────────────────────────────────────

/// Frame opcodes understood by this client.
///
/// obs-websocket also defines Reidentify (3) and the batch opcodes (8, 9);
/// this client never sends them and treats them as unknown on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Hello = 0,
    Identify = 1,
    Identified = 2,
    Event = 5,
    Request = 6,
    RequestResponse = 7,
}

impl TryFrom<u64> for OpCode {
    type Error = ();

    fn try_from(value: u64) -> Result<Self, ()> {
        match value {
            0 => Ok(OpCode::Hello),
            1 => Ok(OpCode::Identify),
            2 => Ok(OpCode::Identified),
            5 => Ok(OpCode::Event),
            6 => Ok(OpCode::Request),
            7 => Ok(OpCode::RequestResponse),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OpCode::Hello => "Hello",
            OpCode::Identify => "Identify",
            OpCode::Identified => "Identified",
            OpCode::Event => "Event",
            OpCode::Request => "Request",
            OpCode::RequestResponse => "RequestResponse",
        };
        write!(f, "{name} (op {})", *self as u8)
    }
}

// ── Request status codes ──────────────────────────────────────────────────────

/// `requestStatus.code` values the recording operations care about.
pub mod status_code {
    /// The request succeeded.
    pub const SUCCESS: u32 = 100;
    /// The output is already running (e.g. `StartRecord` while recording).
    pub const OUTPUT_RUNNING: u32 = 500;
    /// The output is not running (e.g. `StopRecord` while idle).
    pub const OUTPUT_NOT_RUNNING: u32 = 501;
}

// ── WebSocket close codes ─────────────────────────────────────────────────────

/// Close codes obs-websocket uses when it drops a session.
pub mod close_code {
    pub const UNKNOWN_REASON: u16 = 4000;
    pub const MESSAGE_DECODE_ERROR: u16 = 4002;
    pub const MISSING_DATA_FIELD: u16 = 4003;
    pub const INVALID_DATA_FIELD_TYPE: u16 = 4004;
    pub const INVALID_DATA_FIELD_VALUE: u16 = 4005;
    pub const UNKNOWN_OP_CODE: u16 = 4006;
    pub const NOT_IDENTIFIED: u16 = 4007;
    pub const ALREADY_IDENTIFIED: u16 = 4008;
    pub const AUTHENTICATION_FAILED: u16 = 4009;
    pub const UNSUPPORTED_RPC_VERSION: u16 = 4010;
    pub const SESSION_INVALIDATED: u16 = 4011;
    pub const UNSUPPORTED_FEATURE: u16 = 4012;

    /// Human-readable name for a close code, for log lines.
    pub fn describe(code: u16) -> &'static str {
        match code {
            1000 => "normal closure",
            1001 => "going away",
            UNKNOWN_REASON => "unknown reason",
            MESSAGE_DECODE_ERROR => "message decode error",
            MISSING_DATA_FIELD => "missing data field",
            INVALID_DATA_FIELD_TYPE => "invalid data field type",
            INVALID_DATA_FIELD_VALUE => "invalid data field value",
            UNKNOWN_OP_CODE => "unknown opcode",
            NOT_IDENTIFIED => "not identified",
            ALREADY_IDENTIFIED => "already identified",
            AUTHENTICATION_FAILED => "authentication failed",
            UNSUPPORTED_RPC_VERSION => "unsupported rpc version",
            SESSION_INVALIDATED => "session invalidated",
            UNSUPPORTED_FEATURE => "unsupported feature",
            _ => "unrecognised close code",
        }
    }
}

// ── Handshake payloads ────────────────────────────────────────────────────────

/// Op 0, server → client. First frame after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs_web_socket_version: Option<String>,
    pub rpc_version: u32,
    /// Present only when the server has a password configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthChallenge>,
}

/// The `authentication` object inside [`Hello`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChallenge {
    pub challenge: String,
    pub salt: String,
}

/// Op 1, client → server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    pub rpc_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    /// Event subscription bitmask; omitted means the server default
    /// (all non-high-volume events, which includes output events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_subscriptions: Option<u32>,
}

/// Op 2, server → client. The session is usable once this arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identified {
    pub negotiated_rpc_version: u32,
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Op 5 payload exactly as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_intent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<Value>,
}

/// `eventData` of `RecordStateChanged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStateChanged {
    pub output_active: bool,
    /// e.g. `OBS_WEBSOCKET_OUTPUT_STARTED`, `OBS_WEBSOCKET_OUTPUT_STOPPED`.
    pub output_state: String,
    /// Only present once the file exists (started/stopped states).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// A decoded server event.
///
/// Event kinds the controller acts on get their own variant with a typed
/// schema; everything else is kept as [`ObsEvent::Other`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObsEvent {
    RecordStateChanged(RecordStateChanged),
    /// OBS is shutting down; the socket will close shortly.
    ExitStarted,
    Other {
        event_type: String,
        event_data: Option<Value>,
    },
}

impl ObsEvent {
    pub const RECORD_STATE_CHANGED: &'static str = "RecordStateChanged";
    pub const EXIT_STARTED: &'static str = "ExitStarted";

    /// The `eventType` string this event was decoded from.
    pub fn event_type(&self) -> &str {
        match self {
            ObsEvent::RecordStateChanged(_) => Self::RECORD_STATE_CHANGED,
            ObsEvent::ExitStarted => Self::EXIT_STARTED,
            ObsEvent::Other { event_type, .. } => event_type,
        }
    }

    /// Decodes the typed schema for known event kinds.
    pub fn from_payload(payload: EventPayload) -> Result<Self, serde_json::Error> {
        match payload.event_type.as_str() {
            Self::RECORD_STATE_CHANGED => {
                let data = payload.event_data.unwrap_or(Value::Null);
                Ok(ObsEvent::RecordStateChanged(serde_json::from_value(data)?))
            }
            Self::EXIT_STARTED => Ok(ObsEvent::ExitStarted),
            _ => Ok(ObsEvent::Other {
                event_type: payload.event_type,
                event_data: payload.event_data,
            }),
        }
    }

    pub fn to_payload(&self) -> Result<EventPayload, serde_json::Error> {
        let (event_type, event_data) = match self {
            ObsEvent::RecordStateChanged(data) => (
                Self::RECORD_STATE_CHANGED.to_string(),
                Some(serde_json::to_value(data)?),
            ),
            ObsEvent::ExitStarted => (Self::EXIT_STARTED.to_string(), None),
            ObsEvent::Other {
                event_type,
                event_data,
            } => (event_type.clone(), event_data.clone()),
        };
        Ok(EventPayload {
            event_type,
            event_intent: None,
            event_data,
        })
    }
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Op 6, client → server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_type: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_data: Option<Value>,
}

/// Op 7, server → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub request_type: String,
    pub request_id: String,
    pub request_status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Value>,
}

/// `requestStatus` inside [`RequestResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatus {
    pub result: bool,
    pub code: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RequestStatus {
    /// A successful status (code 100), as the server sends it.
    pub fn success() -> Self {
        Self {
            result: true,
            code: status_code::SUCCESS,
            comment: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
