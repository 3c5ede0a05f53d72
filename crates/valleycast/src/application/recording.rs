//! Recording operations: status, start, stop (with confirmation), restart.
//!
//! # Architecture
//!
//! [`RecordingControl`] depends only on the [`ObsRequester`] trait, which the
//! WebSocket controller implements in the infrastructure layer. Tests inject
//! a scripted requester instead of a live socket.
//!
//! Stopping is the only long-running operation. OBS acknowledges
//! `StopRecord` before the file is finalised, so the stop is confirmed by
//! polling `GetRecordStatus` until `outputActive` is false, bounded by an
//! attempt ceiling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use valleycast_core::protocol::requests::{
    decode_response, GetRecordStatus, ObsRequest, StartRecord, StopRecord,
};
use valleycast_core::protocol::{status_code, RequestResponse};
use valleycast_core::RecordingStatus;

use crate::application::correlator::RequestError;

/// Sends one request and awaits its correlated response.
#[async_trait]
pub trait ObsRequester: Send + Sync {
    async fn send_request(
        &self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> Result<RequestResponse, RequestError>;
}

/// Sends a typed request and decodes its `responseData`.
pub async fn call<R>(
    requester: &dyn ObsRequester,
    request: &R,
) -> Result<R::Response, RequestError>
where
    R: ObsRequest + Sync,
{
    let response = requester
        .send_request(R::REQUEST_TYPE, request.request_data())
        .await?;
    decode_response::<R>(response.response_data.as_ref()).map_err(|e| {
        RequestError::MalformedResponse {
            request_type: R::REQUEST_TYPE.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Error type for the recording operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordingError {
    #[error(transparent)]
    Request(#[from] RequestError),

    /// OBS accepted StopRecord but kept reporting an active output.
    #[error("OBS still reports recording after {attempts} status checks")]
    StopNotConfirmed { attempts: u32 },
}

/// How a stop is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPolling {
    /// Delay between status checks.
    pub interval: Duration,
    /// Status checks before giving up.
    pub attempts: u32,
}

impl Default for StopPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            attempts: 40,
        }
    }
}

/// The recording commands session hooks and the CLI issue.
#[async_trait]
pub trait RecordingCommands: Send + Sync {
    /// Queries OBS and refreshes the cached status.
    async fn get_record_status(&self) -> Result<bool, RecordingError>;

    /// Starts recording. `Ok(true)` once OBS reports the output running,
    /// including when it was already running.
    async fn start_recording(&self) -> Result<bool, RecordingError>;

    /// Stops recording and waits until OBS reports the output inactive.
    /// Returns the path of the finished file when OBS reports one.
    async fn stop_recording(&self) -> Result<Option<String>, RecordingError>;

    /// Stop, then start. The start is only issued after the stop is confirmed.
    async fn restart_recording(&self) -> Result<bool, RecordingError>;
}

pub struct RecordingControl {
    requester: Arc<dyn ObsRequester>,
    status: Arc<RecordingStatus>,
    polling: StopPolling,
}

impl RecordingControl {
    pub fn new(
        requester: Arc<dyn ObsRequester>,
        status: Arc<RecordingStatus>,
        polling: StopPolling,
    ) -> Self {
        Self {
            requester,
            status,
            polling,
        }
    }

    async fn confirm_stopped(&self) -> Result<(), RecordingError> {
        for attempt in 1..=self.polling.attempts {
            if !self.get_record_status().await? {
                debug!("stop confirmed on status check {attempt}");
                return Ok(());
            }
            if attempt < self.polling.attempts {
                tokio::time::sleep(self.polling.interval).await;
            }
        }
        warn!(
            "OBS still recording after {} status checks",
            self.polling.attempts
        );
        Err(RecordingError::StopNotConfirmed {
            attempts: self.polling.attempts,
        })
    }
}

#[async_trait]
impl RecordingCommands for RecordingControl {
    async fn get_record_status(&self) -> Result<bool, RecordingError> {
        let status = call(self.requester.as_ref(), &GetRecordStatus).await?;
        self.status.set(status.output_active);
        if status.output_active {
            info!("OBS is currently recording");
        } else {
            info!("OBS is not recording");
        }
        Ok(status.output_active)
    }

    async fn start_recording(&self) -> Result<bool, RecordingError> {
        match call(self.requester.as_ref(), &StartRecord).await {
            Ok(_) => info!("recording started"),
            Err(RequestError::Rejected { code, .. }) if code == status_code::OUTPUT_RUNNING => {
                info!("OBS was already recording")
            }
            Err(e) => return Err(e.into()),
        }
        self.status.set(true);
        Ok(true)
    }

    async fn stop_recording(&self) -> Result<Option<String>, RecordingError> {
        let output_path = match call(self.requester.as_ref(), &StopRecord).await {
            Ok(response) => response.output_path,
            Err(RequestError::Rejected { code, .. }) if code == status_code::OUTPUT_NOT_RUNNING => {
                info!("OBS was not recording");
                self.status.set(false);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        self.confirm_stopped().await?;
        match &output_path {
            Some(path) => info!("recording stopped, saved to {path}"),
            None => info!("recording stopped"),
        }
        Ok(output_path)
    }

    async fn restart_recording(&self) -> Result<bool, RecordingError> {
        info!("restarting recording");
        self.stop_recording().await?;
        self.start_recording().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use valleycast_core::protocol::RequestStatus;

    // ── Test doubles ──────────────────────────────────────────────────────────

    /// Answers requests from a script and records the request types it saw.
    #[derive(Default)]
    struct ScriptedRequester {
        script: Mutex<VecDeque<Result<Option<Value>, RequestError>>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedRequester {
        fn with(script: Vec<Result<Option<Value>, RequestError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObsRequester for ScriptedRequester {
        async fn send_request(
            &self,
            request_type: &str,
            _request_data: Option<Value>,
        ) -> Result<RequestResponse, RequestError> {
            self.sent.lock().unwrap().push(request_type.to_string());
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(RequestError::NotConnected));
            next.map(|response_data| RequestResponse {
                request_type: request_type.to_string(),
                request_id: "scripted".to_string(),
                request_status: RequestStatus::success(),
                response_data,
            })
        }
    }

    fn status(active: bool) -> Result<Option<Value>, RequestError> {
        Ok(Some(json!({ "outputActive": active, "outputPaused": false })))
    }

    fn rejected(request_type: &str, code: u32) -> Result<Option<Value>, RequestError> {
        Err(RequestError::Rejected {
            request_type: request_type.to_string(),
            code,
            comment: None,
        })
    }

    fn control(
        requester: Arc<ScriptedRequester>,
        attempts: u32,
    ) -> (RecordingControl, Arc<RecordingStatus>) {
        let status = Arc::new(RecordingStatus::new());
        let control = RecordingControl::new(
            requester,
            Arc::clone(&status),
            StopPolling {
                interval: Duration::from_millis(1),
                attempts,
            },
        );
        (control, status)
    }

    // ── get_record_status ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_get_record_status_updates_cache() {
        // Arrange
        let requester = ScriptedRequester::with(vec![status(true)]);
        let (control, cache) = control(Arc::clone(&requester), 3);

        // Act
        let recording = control.get_record_status().await.unwrap();

        // Assert
        assert!(recording);
        assert_eq!(cache.known(), Some(true));
        assert_eq!(requester.sent(), vec!["GetRecordStatus"]);
    }

    #[tokio::test]
    async fn test_get_record_status_with_bad_schema_is_malformed() {
        let requester = ScriptedRequester::with(vec![Ok(Some(json!({ "outputPaused": true })))]);
        let (control, cache) = control(requester, 3);

        let result = control.get_record_status().await;

        assert!(matches!(
            result,
            Err(RecordingError::Request(RequestError::MalformedResponse { .. }))
        ));
        assert_eq!(cache.known(), None);
    }

    #[tokio::test]
    async fn test_disconnected_request_surfaces_distinct_error() {
        let requester = ScriptedRequester::with(vec![Err(RequestError::Disconnected(
            "connection closed".to_string(),
        ))]);
        let (control, _) = control(requester, 3);

        let result = control.get_record_status().await;

        assert_eq!(
            result,
            Err(RecordingError::Request(RequestError::Disconnected(
                "connection closed".to_string()
            )))
        );
    }

    // ── start_recording ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_start_recording_sets_cache() {
        let requester = ScriptedRequester::with(vec![Ok(None)]);
        let (control, cache) = control(Arc::clone(&requester), 3);

        assert_eq!(control.start_recording().await, Ok(true));
        assert_eq!(cache.known(), Some(true));
        assert_eq!(requester.sent(), vec!["StartRecord"]);
    }

    #[tokio::test]
    async fn test_start_recording_when_already_running_is_ok() {
        let requester = ScriptedRequester::with(vec![rejected("StartRecord", 500)]);
        let (control, _) = control(requester, 3);
        assert_eq!(control.start_recording().await, Ok(true));
    }

    #[tokio::test]
    async fn test_start_recording_other_rejection_is_error() {
        let requester = ScriptedRequester::with(vec![rejected("StartRecord", 207)]);
        let (control, cache) = control(requester, 3);

        let result = control.start_recording().await;

        assert!(matches!(
            result,
            Err(RecordingError::Request(RequestError::Rejected { code: 207, .. }))
        ));
        assert_eq!(cache.known(), None);
    }

    // ── stop_recording ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_stop_completes_only_after_third_poll_reports_inactive() {
        // Arrange: StopRecord ack, then active, active, inactive
        let requester = ScriptedRequester::with(vec![
            Ok(Some(json!({ "outputPath": "/videos/day3.mkv" }))),
            status(true),
            status(true),
            status(false),
        ]);
        let (control, cache) = control(Arc::clone(&requester), 10);

        // Act
        let path = control.stop_recording().await.unwrap();

        // Assert
        assert_eq!(path.as_deref(), Some("/videos/day3.mkv"));
        assert_eq!(
            requester.sent(),
            vec!["StopRecord", "GetRecordStatus", "GetRecordStatus", "GetRecordStatus"]
        );
        assert_eq!(cache.known(), Some(false));
    }

    #[tokio::test]
    async fn test_stop_gives_up_after_attempt_ceiling() {
        // Arrange: OBS never reports stopped
        let mut script = vec![Ok(None)];
        script.extend((0..5).map(|_| status(true)));
        let requester = ScriptedRequester::with(script);
        let (control, _) = control(Arc::clone(&requester), 5);

        // Act
        let result = control.stop_recording().await;

        // Assert
        assert_eq!(result, Err(RecordingError::StopNotConfirmed { attempts: 5 }));
        assert_eq!(requester.sent().len(), 6);
    }

    #[tokio::test]
    async fn test_stop_when_not_recording_skips_polling() {
        let requester = ScriptedRequester::with(vec![rejected("StopRecord", 501)]);
        let (control, cache) = control(Arc::clone(&requester), 5);

        assert_eq!(control.stop_recording().await, Ok(None));
        assert_eq!(requester.sent(), vec!["StopRecord"]);
        assert_eq!(cache.known(), Some(false));
    }

    // ── restart_recording ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_restart_stops_confirms_then_starts() {
        let requester = ScriptedRequester::with(vec![Ok(None), status(false), Ok(None)]);
        let (control, cache) = control(Arc::clone(&requester), 5);

        assert_eq!(control.restart_recording().await, Ok(true));
        assert_eq!(
            requester.sent(),
            vec!["StopRecord", "GetRecordStatus", "StartRecord"]
        );
        assert_eq!(cache.known(), Some(true));
    }

    #[tokio::test]
    async fn test_restart_does_not_start_when_stop_fails() {
        let requester = ScriptedRequester::with(vec![Err(RequestError::NotConnected)]);
        let (control, _) = control(Arc::clone(&requester), 5);

        assert!(control.restart_recording().await.is_err());
        assert_eq!(requester.sent(), vec!["StopRecord"]);
    }
}
