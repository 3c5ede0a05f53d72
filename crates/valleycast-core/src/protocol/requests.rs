//! Typed request/response pairs.
//!
//! Each request type the controller issues implements [`ObsRequest`], which
//! ties the `requestType` string to the schema of its `responseData`. The
//! response is decoded once, where the correlator hands it back, instead of
//! being picked apart field by field at every call site.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request with a known response schema.
pub trait ObsRequest {
    /// The `requestType` string sent on the wire.
    const REQUEST_TYPE: &'static str;

    /// Schema of `responseData`.
    type Response: DeserializeOwned;

    /// The `requestData` object, if this request takes parameters.
    fn request_data(&self) -> Option<Value> {
        None
    }
}

/// Decodes `responseData` into the request's response schema.
///
/// obs-websocket omits `responseData` entirely for requests with nothing to
/// report, so a missing field decodes as an empty object.
pub fn decode_response<R: ObsRequest>(
    response_data: Option<&Value>,
) -> Result<R::Response, serde_json::Error> {
    match response_data {
        Some(data) => R::Response::deserialize(data),
        None => R::Response::deserialize(&Value::Object(serde_json::Map::new())),
    }
}

/// Response schema for requests that carry no `responseData`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoResponseData {}

// ── Record requests ───────────────────────────────────────────────────────────

/// `GetRecordStatus`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetRecordStatus;

/// `responseData` of `GetRecordStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStatus {
    pub output_active: bool,
    #[serde(default)]
    pub output_paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_timecode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_bytes: Option<u64>,
}

impl ObsRequest for GetRecordStatus {
    const REQUEST_TYPE: &'static str = "GetRecordStatus";
    type Response = RecordStatus;
}

/// `StartRecord`
#[derive(Debug, Clone, Copy, Default)]
pub struct StartRecord;

impl ObsRequest for StartRecord {
    const REQUEST_TYPE: &'static str = "StartRecord";
    type Response = NoResponseData;
}

/// `StopRecord`
#[derive(Debug, Clone, Copy, Default)]
pub struct StopRecord;

/// `responseData` of `StopRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecordResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl ObsRequest for StopRecord {
    const REQUEST_TYPE: &'static str = "StopRecord";
    type Response = StopRecordResponse;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
