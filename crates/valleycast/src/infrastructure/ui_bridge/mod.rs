//! Console bridge between the controller and the person at the keyboard.
//!
//! The [`Notifier`] seam is implemented here for a terminal: messages are
//! printed, and Yes/No prompts list their choices and read the answer on a
//! blocking thread so the Tokio runtime keeps serving the socket while the
//! user thinks.
//!
//! # DTOs
//!
//! [`ControllerStatusDto`] is a plain serializable snapshot of the
//! controller, used by the CLI's `--json` output. Every command result is
//! wrapped in [`CommandResult`] so scripts can check a single `success` flag:
//!
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..." }
//! ```

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::notifier::{ChoiceCallback, Notifier};
use crate::infrastructure::network::ObsController;

// ── Console notifier ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("[OBS] {message}");
    }

    fn prompt(&self, message: &str, choices: &[String], on_choice: ChoiceCallback) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "[OBS] {message}");
        for (i, choice) in choices.iter().enumerate() {
            let _ = writeln!(out, "  {}) {choice}", i + 1);
        }
        let _ = write!(out, "> ");
        let _ = out.flush();
        drop(out);

        let choices = choices.to_vec();
        std::thread::spawn(move || {
            let mut line = String::new();
            if let Err(e) = io::stdin().lock().read_line(&mut line) {
                warn!("could not read answer: {e}");
                return;
            }
            match resolve_choice(&line, &choices) {
                Some(choice) => on_choice(choice),
                None => debug!("prompt dismissed with '{}'", line.trim()),
            }
        });
    }
}

/// Maps typed input to one of `choices`: a 1-based index, the label itself
/// (case-insensitive), or a prefix matching exactly one label.
pub fn resolve_choice(input: &str, choices: &[String]) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(index) = input.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| choices.get(i)).cloned();
    }

    let lowered = input.to_lowercase();
    if let Some(exact) = choices.iter().find(|c| c.to_lowercase() == lowered) {
        return Some(exact.clone());
    }

    let mut prefixed = choices
        .iter()
        .filter(|c| c.to_lowercase().starts_with(&lowered));
    match (prefixed.next(), prefixed.next()) {
        (Some(only), None) => Some(only.clone()),
        _ => None,
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStatusDto {
    /// `ws://host:port`
    pub server: String,
    /// Phase name, e.g. `"connected"`.
    pub phase: String,
    /// Last recording state OBS reported; `None` before the first report.
    pub recording: Option<bool>,
    pub pending_requests: usize,
}

impl ControllerStatusDto {
    pub fn snapshot(controller: &ObsController) -> Self {
        Self {
            server: controller.config().url.clone(),
            phase: controller.phase().to_string(),
            recording: controller.recording_status().known(),
            pending_requests: controller.pending_requests(),
        }
    }
}

/// Unified envelope for CLI command output.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

impl<T: Serialize, E: std::fmt::Display> From<Result<T, E>> for CommandResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
