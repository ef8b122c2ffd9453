//! Action model
//!
//! The closed set of vehicle intents the executor understands, their wire
//! encoding in the Tello SDK dialect, and the JSON shape produced by the
//! external language-model translator.

use crate::validate::ValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single, typed unit of vehicle intent
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Takeoff,
    Land,
    Move { direction: Direction, distance_cm: u32 },
    Rotate { angle_deg: i32 },
    Hover { duration_s: u32 },
    Scan,
    EmergencyStop,
}

/// Movement directions supported by the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Wire keyword for this direction
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Back => "back",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl Action {
    /// Encode this action as a Tello SDK command string.
    ///
    /// The protocol is plaintext ASCII, one datagram per command. `Hover`
    /// and `Scan` both map to `stop` (hold position); the hover duration
    /// and scan sampling are handled above the wire by the executor.
    pub fn wire_command(&self) -> String {
        match self {
            Action::Takeoff => "takeoff".into(),
            Action::Land => "land".into(),
            Action::Move {
                direction,
                distance_cm,
            } => format!("{} {}", direction.as_str(), distance_cm),
            Action::Rotate { angle_deg } if *angle_deg < 0 => format!("ccw {}", -angle_deg),
            Action::Rotate { angle_deg } => format!("cw {}", angle_deg),
            Action::Hover { .. } | Action::Scan => "stop".into(),
            Action::EmergencyStop => "emergency".into(),
        }
    }

    /// Response timeout budget for this action.
    ///
    /// Takeoff and land block the vehicle's own control loop, so they get
    /// an extended budget; everything else uses the short default.
    pub fn response_timeout(&self) -> Duration {
        match self {
            Action::Takeoff | Action::Land => crate::safety::MANEUVER_TIMEOUT,
            _ => crate::safety::RESPONSE_TIMEOUT,
        }
    }

    /// Short name of the action kind, for logs and warnings
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Takeoff => "takeoff",
            Action::Land => "land",
            Action::Move { .. } => "move",
            Action::Rotate { .. } => "rotate",
            Action::Hover { .. } => "hover",
            Action::Scan => "scan",
            Action::EmergencyStop => "emergency",
        }
    }

    /// Whether this action implies perception sampling on its own,
    /// independent of the instruction text
    pub fn wants_vision(&self) -> bool {
        matches!(self, Action::Scan)
    }
}

/// The JSON object returned by the external translator.
///
/// Only the boundary is specified here; producing this object (the
/// language-model call) is an external concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommand {
    pub action: String,
    #[serde(default)]
    pub parameters: RawParameters,
    pub description: String,
    pub safety_check: bool,
}

/// Optional parameter bag carried by a [`RawCommand`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawParameters {
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub angle: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl TryFrom<RawCommand> for Action {
    type Error = ValidationError;

    /// Structural validation happens here: a raw command must name a known
    /// action kind and carry parameters legal for it. Out-of-range values
    /// are rejected, never clamped.
    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        let action = match raw.action.as_str() {
            "takeoff" => Action::Takeoff,
            "land" => Action::Land,
            "move" => {
                let direction = raw
                    .parameters
                    .direction
                    .ok_or(ValidationError::MissingParameter("direction"))?;
                let distance = raw
                    .parameters
                    .distance
                    .ok_or(ValidationError::MissingParameter("distance"))?;
                if !distance.is_finite() || distance.fract() != 0.0 || distance < 0.0 {
                    return Err(ValidationError::OutOfRange {
                        field: "distance",
                        value: distance,
                        min: 0.0,
                        max: crate::validate::MAX_DISTANCE_CM as f64,
                    });
                }
                Action::Move {
                    direction,
                    distance_cm: distance as u32,
                }
            }
            "rotate" => {
                let angle = raw
                    .parameters
                    .angle
                    .ok_or(ValidationError::MissingParameter("angle"))?;
                if !angle.is_finite() || angle.fract() != 0.0 {
                    return Err(ValidationError::OutOfRange {
                        field: "angle",
                        value: angle,
                        min: -(crate::validate::MAX_ANGLE_DEG as f64),
                        max: crate::validate::MAX_ANGLE_DEG as f64,
                    });
                }
                Action::Rotate {
                    angle_deg: angle as i32,
                }
            }
            "hover" => {
                let duration = raw.parameters.duration.unwrap_or(0.0);
                if !duration.is_finite() || duration < 0.0 {
                    return Err(ValidationError::OutOfRange {
                        field: "duration",
                        value: duration,
                        min: 0.0,
                        max: crate::validate::MAX_HOVER_SECS as f64,
                    });
                }
                Action::Hover {
                    duration_s: duration as u32,
                }
            }
            "scan" => Action::Scan,
            "emergency" => Action::EmergencyStop,
            other => return Err(ValidationError::UnknownAction(other.to_string())),
        };

        crate::validate::validate(&action)?;
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_encoding() {
        assert_eq!(Action::Takeoff.wire_command(), "takeoff");
        assert_eq!(Action::Land.wire_command(), "land");
        assert_eq!(
            Action::Move {
                direction: Direction::Forward,
                distance_cm: 100
            }
            .wire_command(),
            "forward 100"
        );
        assert_eq!(Action::Rotate { angle_deg: 45 }.wire_command(), "cw 45");
        assert_eq!(Action::Rotate { angle_deg: -90 }.wire_command(), "ccw 90");
        assert_eq!(Action::Hover { duration_s: 5 }.wire_command(), "stop");
        assert_eq!(Action::EmergencyStop.wire_command(), "emergency");
    }

    #[test]
    fn test_maneuver_timeouts_extended() {
        assert!(Action::Takeoff.response_timeout() > Action::Scan.response_timeout());
        assert!(Action::Land.response_timeout() > Action::Scan.response_timeout());
    }

    #[test]
    fn test_raw_command_parse() {
        let raw: RawCommand = serde_json::from_str(
            r#"{"action":"move","parameters":{"direction":"forward","distance":200},
                "description":"Moving forward 2 meters","safety_check":true}"#,
        )
        .unwrap();
        let action = Action::try_from(raw).unwrap();
        assert_eq!(
            action,
            Action::Move {
                direction: Direction::Forward,
                distance_cm: 200
            }
        );
    }

    #[test]
    fn test_raw_command_unknown_action() {
        let raw: RawCommand = serde_json::from_str(
            r#"{"action":"teleport","description":"nope","safety_check":true}"#,
        )
        .unwrap();
        assert!(matches!(
            Action::try_from(raw),
            Err(ValidationError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_raw_command_missing_parameter() {
        let raw: RawCommand = serde_json::from_str(
            r#"{"action":"move","parameters":{"direction":"up"},
                "description":"up","safety_check":true}"#,
        )
        .unwrap();
        assert!(matches!(
            Action::try_from(raw),
            Err(ValidationError::MissingParameter("distance"))
        ));
    }

    #[test]
    fn test_raw_command_out_of_range() {
        let raw: RawCommand = serde_json::from_str(
            r#"{"action":"rotate","parameters":{"angle":361},
                "description":"spin","safety_check":true}"#,
        )
        .unwrap();
        assert!(matches!(
            Action::try_from(raw),
            Err(ValidationError::OutOfRange { field: "angle", .. })
        ));
    }
}
