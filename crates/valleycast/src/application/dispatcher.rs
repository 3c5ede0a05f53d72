//! EventDispatcher: applies unsolicited OBS events to cached state.
//!
//! Dispatch runs inline on the socket's read loop, so it only touches the
//! atomic recording cache and a broadcast channel. Anything slow belongs to
//! a subscriber.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};
use valleycast_core::protocol::ObsEvent;
use valleycast_core::RecordingStatus;

/// Events buffered per subscriber before the slowest one starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct EventDispatcher {
    recording: Arc<RecordingStatus>,
    events: broadcast::Sender<ObsEvent>,
}

impl EventDispatcher {
    pub fn new(recording: Arc<RecordingStatus>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { recording, events }
    }

    /// Receives every event dispatched after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ObsEvent> {
        self.events.subscribe()
    }

    pub fn dispatch(&self, event: ObsEvent) {
        match &event {
            ObsEvent::RecordStateChanged(change) => {
                self.recording.set(change.output_active);
                let state = if change.output_active { "active" } else { "inactive" };
                match &change.output_path {
                    Some(path) => info!(
                        "recording {state} ({}), output: {path}",
                        change.output_state
                    ),
                    None => info!("recording {state} ({})", change.output_state),
                }
            }
            ObsEvent::ExitStarted => info!("OBS is shutting down"),
            ObsEvent::Other { event_type, .. } => debug!("ignoring {event_type} event"),
        }

        // No subscribers is the normal case for a headless controller.
        let _ = self.events.send(event);
    }
}
