//! Tello Shared Types
//!
//! This crate provides the action model, validation, and flight state
//! machine shared between the agent binary and its tests.

pub mod action;
pub mod state_machine;
pub mod validate;

pub use action::{Action, Direction, RawCommand, RawParameters};
pub use state_machine::{FlightState, FlightStateHandle};
pub use validate::{check_sequence, is_safe, validate, SequenceWarning, ValidationError};

/// Safety and protocol parameters for the system
pub mod safety {
    use std::time::Duration;

    /// Send attempts before giving up on a command
    pub const SEND_MAX_ATTEMPTS: u32 = 3;

    /// Backoff between send attempts
    pub const SEND_RETRY_DELAY: Duration = Duration::from_millis(500);

    /// Default response timeout for ordinary commands
    pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Extended timeout for takeoff/land - these block the drone's own
    /// control loop and routinely take tens of seconds
    pub const MANEUVER_TIMEOUT: Duration = Duration::from_secs(20);

    /// Overall budget for the fail-safe landing attempt at shutdown
    pub const FAILSAFE_LAND_TIMEOUT: Duration = Duration::from_secs(10);

    /// Settle delay between sweep steps, letting rotation stop and the
    /// latest perception sample refresh
    pub const SWEEP_SETTLE: Duration = Duration::from_secs(2);

    /// Sweep decomposition: 8 steps of 45 degrees
    pub const SWEEP_STEPS: u32 = 8;
    pub const SWEEP_STEP_DEG: i32 = 45;
}

/// Errors surfaced by the command link
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No response arrived within the caller's budget
    #[error("no response within {0:?}")]
    Timeout(std::time::Duration),

    /// Socket-level failure after all send attempts were exhausted
    #[error("link i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed while a send was in progress
    #[error("link closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display() {
        let err = LinkError::Timeout(std::time::Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));

        let io = LinkError::from(std::io::Error::other("no route"));
        assert!(matches!(io, LinkError::Io(_)));
    }
}
