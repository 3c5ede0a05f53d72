//! Bounded reconnection policy.
//!
//! The policy only counts; the caller decides how to wait and how to
//! connect. Attempts are consecutive failures since the last successful
//! handshake.

/// What to do after a connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Try again. `attempt` is 1-based.
    Retry { attempt: u32, ceiling: u32 },
    /// The ceiling was reached. The counter has already been reset.
    GiveUp { ceiling: u32 },
}

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    ceiling: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(ceiling: u32) -> Self {
        Self {
            ceiling,
            attempts: 0,
        }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records a disconnect and decides whether to retry.
    ///
    /// A ceiling of zero gives up on the first disconnect.
    pub fn on_disconnected(&mut self) -> ReconnectDecision {
        if self.attempts < self.ceiling {
            self.attempts += 1;
            ReconnectDecision::Retry {
                attempt: self.attempts,
                ceiling: self.ceiling,
            }
        } else {
            self.attempts = 0;
            ReconnectDecision::GiveUp {
                ceiling: self.ceiling,
            }
        }
    }

    /// The handshake completed; the next failure starts counting from one.
    pub fn on_connected(&mut self) {
        self.attempts = 0;
    }

    /// Manual reconnect from the user.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
