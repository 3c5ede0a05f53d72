//! JSON codec for obs-websocket v5 frames.
//!
//! Wire format, one frame per WebSocket text message:
//! ```text
//! {"op": <opcode>, "d": { ...payload... }}
//! ```
//! Decoding is two-stage: the envelope is parsed first so an unknown opcode
//! can be reported separately from a payload that does not match its schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::{
    EventPayload, Hello, Identified, Identify, ObsEvent, OpCode, Request, RequestResponse,
};

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    /// The text is not a JSON object with `op` and `d` fields.
    #[error("invalid frame JSON: {0}")]
    InvalidJson(String),

    /// The `op` field holds an opcode this client does not handle.
    #[error("unknown opcode: {0}")]
    UnknownOpCode(u64),

    /// The `d` object does not match the schema for its opcode.
    #[error("malformed {op} payload: {reason}")]
    MalformedPayload { op: OpCode, reason: String },

    /// The frame could not be serialized.
    #[error("failed to serialize frame: {0}")]
    Serialize(String),
}

/// A decoded obs-websocket frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Hello(Hello),
    Identify(Identify),
    Identified(Identified),
    Event(ObsEvent),
    Request(Request),
    RequestResponse(RequestResponse),
}

impl Frame {
    /// Returns the opcode this frame is sent with.
    pub fn op_code(&self) -> OpCode {
        match self {
            Frame::Hello(_) => OpCode::Hello,
            Frame::Identify(_) => OpCode::Identify,
            Frame::Identified(_) => OpCode::Identified,
            Frame::Event(_) => OpCode::Event,
            Frame::Request(_) => OpCode::Request,
            Frame::RequestResponse(_) => OpCode::RequestResponse,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawFrame {
    op: u64,
    d: Value,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one text message into a [`Frame`].
///
/// # Errors
///
/// Returns [`CodecError`] if the text is not a valid frame.
///
/// # Examples
///
/// ```rust
/// use valleycast_core::protocol::codec::{decode_frame, Frame};
///
/// let frame = decode_frame(r#"{"op":2,"d":{"negotiatedRpcVersion":1}}"#).unwrap();
/// assert!(matches!(frame, Frame::Identified(_)));
/// ```
pub fn decode_frame(text: &str) -> Result<Frame, CodecError> {
    let raw: RawFrame =
        serde_json::from_str(text).map_err(|e| CodecError::InvalidJson(e.to_string()))?;
    let op = OpCode::try_from(raw.op).map_err(|_| CodecError::UnknownOpCode(raw.op))?;
    let malformed = |e: serde_json::Error| CodecError::MalformedPayload {
        op,
        reason: e.to_string(),
    };

    let frame = match op {
        OpCode::Hello => Frame::Hello(serde_json::from_value(raw.d).map_err(malformed)?),
        OpCode::Identify => Frame::Identify(serde_json::from_value(raw.d).map_err(malformed)?),
        OpCode::Identified => {
            Frame::Identified(serde_json::from_value(raw.d).map_err(malformed)?)
        }
        OpCode::Event => {
            let payload: EventPayload = serde_json::from_value(raw.d).map_err(malformed)?;
            Frame::Event(ObsEvent::from_payload(payload).map_err(malformed)?)
        }
        OpCode::Request => Frame::Request(serde_json::from_value(raw.d).map_err(malformed)?),
        OpCode::RequestResponse => {
            Frame::RequestResponse(serde_json::from_value(raw.d).map_err(malformed)?)
        }
    };
    Ok(frame)
}

/// Encodes a [`Frame`] into the text sent over the socket.
///
/// # Errors
///
/// Returns [`CodecError::Serialize`] if a payload cannot be represented as JSON.
pub fn encode_frame(frame: &Frame) -> Result<String, CodecError> {
    let ser = |e: serde_json::Error| CodecError::Serialize(e.to_string());
    let d = match frame {
        Frame::Hello(p) => serde_json::to_value(p),
        Frame::Identify(p) => serde_json::to_value(p),
        Frame::Identified(p) => serde_json::to_value(p),
        Frame::Event(event) => serde_json::to_value(event.to_payload().map_err(ser)?),
        Frame::Request(p) => serde_json::to_value(p),
        Frame::RequestResponse(p) => serde_json::to_value(p),
    }
    .map_err(ser)?;

    let raw = RawFrame {
        op: frame.op_code() as u64,
        d,
    };
    serde_json::to_string(&raw).map_err(ser)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
