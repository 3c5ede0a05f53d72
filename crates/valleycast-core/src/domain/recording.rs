//! Cached recording state.

use std::sync::atomic::{AtomicU8, Ordering};

const UNKNOWN: u8 = 0;
const IDLE: u8 = 1;
const RECORDING: u8 = 2;

/// Last known "is OBS recording" value.
///
/// Written by request responses and by `RecordStateChanged` events, read by
/// callers from any thread. Reads and writes never block, so the event path
/// can update it inline. Until the first write the value is unknown.
#[derive(Debug, Default)]
pub struct RecordingStatus {
    state: AtomicU8,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until a status round-trip or event has reported a value.
    pub fn known(&self) -> Option<bool> {
        match self.state.load(Ordering::Acquire) {
            IDLE => Some(false),
            RECORDING => Some(true),
            _ => None,
        }
    }

    pub fn set(&self, recording: bool) {
        let value = if recording { RECORDING } else { IDLE };
        self.state.store(value, Ordering::Release);
    }
}
