//! RecordingSession: what the host calls when a save loads or a day starts.
//!
//! Both hooks ask OBS whether it is recording. When it is not, the user is
//! prompted to start; when it is and the configured [`RestartCadence`] says
//! this day begins a new segment, the recording is restarted so each
//! segment lands in its own file.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::application::notifier::Notifier;
use crate::application::recording::{RecordingCommands, RecordingError};

pub const START_PROMPT: &str = "OBS is not recording, do you want to start recording?";
pub const CHOICE_YES: &str = "Yes";
pub const CHOICE_NO: &str = "No";

/// In-game days per month (one season).
pub const DAYS_PER_MONTH: u32 = 28;
const DAYS_PER_WEEK: u32 = 7;

/// When a running recording is split into a new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartCadence {
    #[default]
    Never,
    Daily,
    Weekly,
    Monthly,
}

impl RestartCadence {
    /// Whether `day_of_month` (1-based) starts a new segment.
    pub fn should_restart(self, day_of_month: u32) -> bool {
        let day_index = day_of_month.saturating_sub(1);
        match self {
            RestartCadence::Never => false,
            RestartCadence::Daily => true,
            RestartCadence::Weekly => day_index % DAYS_PER_WEEK == 0,
            RestartCadence::Monthly => day_index % DAYS_PER_MONTH == 0,
        }
    }
}

impl fmt::Display for RestartCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestartCadence::Never => "never",
            RestartCadence::Daily => "daily",
            RestartCadence::Weekly => "weekly",
            RestartCadence::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

impl FromStr for RestartCadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "never" => Ok(RestartCadence::Never),
            "daily" => Ok(RestartCadence::Daily),
            "weekly" => Ok(RestartCadence::Weekly),
            "monthly" => Ok(RestartCadence::Monthly),
            other => Err(format!(
                "unknown restart cadence '{other}' (expected never, daily, weekly or monthly)"
            )),
        }
    }
}

/// What a session hook ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// OBS was recording; nothing to do.
    Recording,
    /// OBS was recording and the recording was split.
    Restarted,
    /// OBS was idle; the user was asked whether to start.
    Prompted,
    /// The status could not be determined.
    Unavailable,
}

pub struct RecordingSession {
    commands: Arc<dyn RecordingCommands>,
    notifier: Arc<dyn Notifier>,
    cadence: RestartCadence,
}

impl RecordingSession {
    pub fn new(
        commands: Arc<dyn RecordingCommands>,
        notifier: Arc<dyn Notifier>,
        cadence: RestartCadence,
    ) -> Self {
        Self {
            commands,
            notifier,
            cadence,
        }
    }

    pub fn cadence(&self) -> RestartCadence {
        self.cadence
    }

    /// A save finished loading.
    pub async fn on_save_loaded(&self) -> SessionCheck {
        match self.commands.get_record_status().await {
            Ok(true) => SessionCheck::Recording,
            Ok(false) => self.prompt_to_start(),
            Err(e) => Self::unavailable(e),
        }
    }

    /// A new in-game day started. `day_of_month` is 1-based.
    pub async fn on_day_started(&self, day_of_month: u32) -> SessionCheck {
        match self.commands.get_record_status().await {
            Ok(true) if self.cadence.should_restart(day_of_month) => {
                info!("day {day_of_month}: {} restart due", self.cadence);
                match self.commands.restart_recording().await {
                    Ok(_) => SessionCheck::Restarted,
                    Err(e) => {
                        error!("failed to restart recording: {e}");
                        SessionCheck::Unavailable
                    }
                }
            }
            Ok(true) => SessionCheck::Recording,
            Ok(false) => self.prompt_to_start(),
            Err(e) => Self::unavailable(e),
        }
    }

    /// Must be called from inside a Tokio runtime: the answer may arrive on
    /// another thread, and the start is spawned back onto this runtime.
    fn prompt_to_start(&self) -> SessionCheck {
        let commands = Arc::clone(&self.commands);
        let runtime = tokio::runtime::Handle::current();
        let choices = [CHOICE_YES.to_string(), CHOICE_NO.to_string()];

        self.notifier.prompt(
            START_PROMPT,
            &choices,
            Box::new(move |answer| {
                if answer != CHOICE_YES {
                    info!("user chose not to start recording");
                    return;
                }
                runtime.spawn(async move {
                    if let Err(e) = commands.start_recording().await {
                        error!("failed to start recording: {e}");
                    }
                });
            }),
        );
        SessionCheck::Prompted
    }

    fn unavailable(e: RecordingError) -> SessionCheck {
        warn!("could not check OBS recording status: {e}");
        SessionCheck::Unavailable
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
