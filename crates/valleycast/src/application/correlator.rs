//! RequestCorrelator: matches RequestResponse frames to the callers awaiting them.
//!
//! Every outbound request gets a fresh `requestId` and a oneshot completion
//! slot stored in a single map. The frame handler resolves slots as
//! responses arrive; a disconnect fails every slot still in the map.
//!
//! The map is the only state shared between caller tasks and the socket's
//! read loop. It sits behind a `std::sync::Mutex` because no lock is held
//! across an `.await`: callers await the oneshot receiver, never the map.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use valleycast_core::protocol::{new_request_id, Request, RequestResponse};

/// Why a request did not produce a usable response.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    /// No session is identified; nothing was sent.
    #[error("not connected to OBS")]
    NotConnected,

    /// The socket closed while the request was in flight.
    #[error("connection to OBS lost: {0}")]
    Disconnected(String),

    /// OBS answered with a non-success `requestStatus`.
    #[error("OBS rejected {request_type} (code {code}){}", comment_suffix(.comment))]
    Rejected {
        request_type: String,
        code: u32,
        comment: Option<String>,
    },

    /// No response arrived within the request timeout.
    #[error("{request_type} timed out after {after:?}")]
    TimedOut {
        request_type: String,
        after: Duration,
    },

    /// The response arrived but `responseData` did not match its schema.
    #[error("malformed {request_type} response: {reason}")]
    MalformedResponse {
        request_type: String,
        reason: String,
    },

    /// The frame could not be encoded or handed to the socket writer.
    #[error("failed to send request: {0}")]
    Send(String),
}

fn comment_suffix(comment: &Option<String>) -> String {
    match comment {
        Some(c) => format!(": {c}"),
        None => String::new(),
    }
}

/// Completion slot handed back to the caller of [`RequestCorrelator::register`].
pub type ResponseReceiver = oneshot::Receiver<Result<RequestResponse, RequestError>>;

struct PendingRequest {
    request_type: String,
    issued_at: Instant,
    slot: oneshot::Sender<Result<RequestResponse, RequestError>>,
}

/// Identifier-keyed map of in-flight requests.
#[derive(Default)]
pub struct RequestCorrelator {
    pending: Mutex<HashMap<String, PendingRequest>>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new pending request and returns the frame payload to send
    /// plus the receiver the caller awaits.
    pub fn register(
        &self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> (Request, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.lock();

        // A v4 collision inside one session is not going to happen, but the
        // map must never hold two slots under one key.
        let mut request_id = new_request_id();
        while pending.contains_key(&request_id) {
            request_id = new_request_id();
        }

        pending.insert(
            request_id.clone(),
            PendingRequest {
                request_type: request_type.to_string(),
                issued_at: Instant::now(),
                slot: tx,
            },
        );
        debug!("registered {request_type} request {request_id}");

        let request = Request {
            request_type: request_type.to_string(),
            request_id,
            request_data,
        };
        (request, rx)
    }

    /// Completes the pending request matching `response.request_id`.
    ///
    /// A non-success `requestStatus` completes the slot with
    /// [`RequestError::Rejected`]. Returns `false` when no request was
    /// pending under that identifier; the response is logged and dropped.
    pub fn resolve(&self, response: RequestResponse) -> bool {
        let Some(entry) = self.lock().remove(&response.request_id) else {
            warn!(
                "dropping {} response for unknown request id {}",
                response.request_type, response.request_id
            );
            return false;
        };

        debug!(
            "{} request {} answered in {:?}",
            entry.request_type,
            response.request_id,
            entry.issued_at.elapsed()
        );

        let outcome = if response.request_status.result {
            Ok(response)
        } else {
            Err(RequestError::Rejected {
                request_type: response.request_type,
                code: response.request_status.code,
                comment: response.request_status.comment,
            })
        };

        // The caller may have given up (timeout, dropped future); nothing to do then.
        let _ = entry.slot.send(outcome);
        true
    }

    /// Removes a pending request without completing it. Used when the
    /// caller stops waiting, so a late response is treated as unknown.
    pub fn remove(&self, request_id: &str) -> bool {
        self.lock().remove(request_id).is_some()
    }

    /// Fails every pending request with [`RequestError::Disconnected`].
    /// Returns how many were failed.
    pub fn fail_all(&self, reason: &str) -> usize {
        let drained: Vec<PendingRequest> = self.lock().drain().map(|(_, p)| p).collect();
        let count = drained.len();
        for entry in drained {
            let _ = entry
                .slot
                .send(Err(RequestError::Disconnected(reason.to_string())));
        }
        if count > 0 {
            warn!("failed {count} pending request(s): {reason}");
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingRequest>> {
        // Nothing in this module panics while holding the lock, so a poisoned
        // map is still consistent.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
