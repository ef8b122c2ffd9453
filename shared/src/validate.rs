//! Action validation
//!
//! Structural range checks (hard failures, rejected before dispatch) and
//! advisory sequence warnings (surfaced to the caller, never blocking).

use crate::action::Action;
use crate::state_machine::FlightState;

/// Maximum movement distance in centimeters
pub const MAX_DISTANCE_CM: u32 = 500;

/// Maximum rotation magnitude in degrees (either direction)
pub const MAX_ANGLE_DEG: i32 = 360;

/// Maximum hover duration in seconds
pub const MAX_HOVER_SECS: u32 = 30;

/// A malformed or out-of-range action, rejected before dispatch
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown action kind '{0}'")]
    UnknownAction(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("{field} = {value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Advisory warning about a suspicious action sequence.
///
/// These never block execution: the system is best-effort on user commands
/// with a human in the loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SequenceWarning {
    #[error("takeoff requested while already airborne")]
    TakeoffWhileAirborne,

    #[error("land requested while already grounded")]
    LandWhileGrounded,

    #[error("{0} requested while grounded; vehicle will ignore it")]
    ManeuverWhileGrounded(&'static str),
}

/// Check that an action's parameters are within the legal ranges.
///
/// Violations are rejected, never silently clamped.
pub fn validate(action: &Action) -> Result<(), ValidationError> {
    match action {
        Action::Move { distance_cm, .. } if *distance_cm > MAX_DISTANCE_CM => {
            Err(ValidationError::OutOfRange {
                field: "distance",
                value: *distance_cm as f64,
                min: 0.0,
                max: MAX_DISTANCE_CM as f64,
            })
        }
        Action::Rotate { angle_deg } if angle_deg.abs() > MAX_ANGLE_DEG => {
            Err(ValidationError::OutOfRange {
                field: "angle",
                value: *angle_deg as f64,
                min: -MAX_ANGLE_DEG as f64,
                max: MAX_ANGLE_DEG as f64,
            })
        }
        Action::Hover { duration_s } if *duration_s > MAX_HOVER_SECS => {
            Err(ValidationError::OutOfRange {
                field: "duration",
                value: *duration_s as f64,
                min: 0.0,
                max: MAX_HOVER_SECS as f64,
            })
        }
        _ => Ok(()),
    }
}

/// A single action is safe by default; only emergency stop bypasses the
/// safety flag entirely.
pub fn is_safe(action: &Action) -> bool {
    !matches!(action, Action::EmergencyStop)
}

/// Flag advisory warnings for suspicious patterns given the accepted
/// history and the tracked flight state.
pub fn check_sequence(
    history: &[Action],
    state: FlightState,
    next: &Action,
) -> Vec<SequenceWarning> {
    let mut warnings = Vec::new();

    match next {
        Action::Takeoff => {
            let airborne_since_last_land = history
                .iter()
                .rev()
                .find(|a| matches!(a, Action::Takeoff | Action::Land | Action::EmergencyStop));
            if matches!(airborne_since_last_land, Some(Action::Takeoff))
                || state == FlightState::Airborne
            {
                warnings.push(SequenceWarning::TakeoffWhileAirborne);
            }
        }
        Action::Land if state == FlightState::Grounded => {
            warnings.push(SequenceWarning::LandWhileGrounded);
        }
        Action::Move { .. } if state == FlightState::Grounded => {
            warnings.push(SequenceWarning::ManeuverWhileGrounded("move"));
        }
        Action::Rotate { .. } if state == FlightState::Grounded => {
            warnings.push(SequenceWarning::ManeuverWhileGrounded("rotate"));
        }
        Action::Hover { .. } if state == FlightState::Grounded => {
            warnings.push(SequenceWarning::ManeuverWhileGrounded("hover"));
        }
        _ => {}
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Direction;

    #[test]
    fn test_move_distance_boundary() {
        let ok = Action::Move {
            direction: Direction::Forward,
            distance_cm: 500,
        };
        assert!(validate(&ok).is_ok());

        let too_far = Action::Move {
            direction: Direction::Forward,
            distance_cm: 501,
        };
        assert!(matches!(
            validate(&too_far),
            Err(ValidationError::OutOfRange {
                field: "distance",
                ..
            })
        ));
    }

    #[test]
    fn test_rotate_angle_boundary() {
        assert!(validate(&Action::Rotate { angle_deg: 360 }).is_ok());
        assert!(validate(&Action::Rotate { angle_deg: -360 }).is_ok());
        assert!(validate(&Action::Rotate { angle_deg: 361 }).is_err());
        assert!(validate(&Action::Rotate { angle_deg: -361 }).is_err());
    }

    #[test]
    fn test_hover_duration_boundary() {
        assert!(validate(&Action::Hover { duration_s: 30 }).is_ok());
        assert!(validate(&Action::Hover { duration_s: 31 }).is_err());
    }

    #[test]
    fn test_only_emergency_is_unsafe() {
        assert!(is_safe(&Action::Takeoff));
        assert!(is_safe(&Action::Land));
        assert!(is_safe(&Action::Scan));
        assert!(!is_safe(&Action::EmergencyStop));
    }

    #[test]
    fn test_consecutive_takeoff_warns() {
        let history = vec![Action::Takeoff];
        let warnings = check_sequence(&history, FlightState::Airborne, &Action::Takeoff);
        assert!(warnings.contains(&SequenceWarning::TakeoffWhileAirborne));
    }

    #[test]
    fn test_takeoff_after_land_is_clean() {
        let history = vec![Action::Takeoff, Action::Land];
        let warnings = check_sequence(&history, FlightState::Grounded, &Action::Takeoff);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_movement_while_grounded_warns() {
        let next = Action::Move {
            direction: Direction::Left,
            distance_cm: 50,
        };
        let warnings = check_sequence(&[], FlightState::Grounded, &next);
        assert_eq!(
            warnings,
            vec![SequenceWarning::ManeuverWhileGrounded("move")]
        );

        // Airborne movement is fine
        let warnings = check_sequence(&[Action::Takeoff], FlightState::Airborne, &next);
        assert!(warnings.is_empty());
    }
}
