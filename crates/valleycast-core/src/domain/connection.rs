//! Connection phase machine.
//!
//! One attempt walks the phases strictly in order:
//! ```text
//! Disconnected → AwaitingHello → AwaitingIdentified → Connected → Disconnected
//! ```
//! Closing is legal from any phase; every other transition must come from
//! the phase immediately before it.

use std::fmt;

use thiserror::Error;

/// Where the current connection attempt stands in the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    /// Socket opened; waiting for the server's Hello.
    AwaitingHello,
    /// Identify sent; waiting for Identified.
    AwaitingIdentified,
    Connected,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionPhase::Disconnected => "disconnected",
            ConnectionPhase::AwaitingHello => "awaiting hello",
            ConnectionPhase::AwaitingIdentified => "awaiting identified",
            ConnectionPhase::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// A transition was requested from the wrong phase.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhaseError {
    #[error("cannot {action} while {phase}")]
    IllegalTransition {
        phase: ConnectionPhase,
        action: &'static str,
    },
}

/// Tracks the phase of a single controller's connection.
#[derive(Debug, Default)]
pub struct ConnectionState {
    phase: ConnectionPhase,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// `true` only once the Identified frame has been received.
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    /// Starts a new attempt. Only legal from `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), PhaseError> {
        self.advance(ConnectionPhase::Disconnected, ConnectionPhase::AwaitingHello, "connect")
    }

    pub fn hello_received(&mut self) -> Result<(), PhaseError> {
        self.advance(
            ConnectionPhase::AwaitingHello,
            ConnectionPhase::AwaitingIdentified,
            "accept Hello",
        )
    }

    pub fn identified(&mut self) -> Result<(), PhaseError> {
        self.advance(
            ConnectionPhase::AwaitingIdentified,
            ConnectionPhase::Connected,
            "accept Identified",
        )
    }

    /// Ends the attempt from whatever phase it reached. Returns that phase.
    pub fn closed(&mut self) -> ConnectionPhase {
        std::mem::replace(&mut self.phase, ConnectionPhase::Disconnected)
    }

    fn advance(
        &mut self,
        from: ConnectionPhase,
        to: ConnectionPhase,
        action: &'static str,
    ) -> Result<(), PhaseError> {
        if self.phase != from {
            return Err(PhaseError::IllegalTransition {
                phase: self.phase,
                action,
            });
        }
        self.phase = to;
        Ok(())
    }
}
