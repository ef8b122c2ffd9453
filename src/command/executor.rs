//! Command executor - validates and dispatches queued actions

use super::sweep;
use crate::drone::DroneController;
use crate::vision::VisionFeed;
use std::sync::Arc;
use std::time::Duration;
use tello_shared::{check_sequence, is_safe, validate, Action, FlightStateHandle};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Instruction text fragments carrying genuine perception intent
const PERCEPTION_KEYWORDS: &[&str] = &[
    "analyze", "detect", "find", "scan", "capture", "search", "look",
];

/// Fragments that enable vision assist for the action. Rotation is
/// included here because sampling is often wanted while turning, but it
/// is not perception intent on its own.
const VISION_KEYWORDS: &[&str] = &[
    "analyze", "detect", "find", "scan", "rotate", "capture", "search", "look",
];

/// Instruction text fragments implying perception should stay on afterwards
const CONTINUOUS_KEYWORDS: &[&str] = &["continuous", "monitor"];

/// Accepted actions kept for the sequence predicate; older entries carry
/// no information the predicate looks at
const HISTORY_LIMIT: usize = 32;

/// One queued unit of work: the validated action plus the originating
/// instruction text (used for intent classification and the sweep trigger)
#[derive(Debug, Clone)]
pub struct Instruction {
    pub action: Action,
    pub text: String,
}

/// Configuration for the command executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Settle delay between sweep steps
    pub sweep_settle: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            sweep_settle: tello_shared::safety::SWEEP_SETTLE,
        }
    }
}

/// Single-consumer loop over the action queue
pub struct CommandExecutor {
    controller: Arc<dyn DroneController>,
    vision: Arc<VisionFeed>,
    flight_state: Arc<FlightStateHandle>,
    config: ExecutorConfig,
    /// Ordered history of accepted actions, for the sequence predicate
    history: Vec<Action>,
}

impl CommandExecutor {
    pub fn new(
        controller: Arc<dyn DroneController>,
        vision: Arc<VisionFeed>,
        flight_state: Arc<FlightStateHandle>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            controller,
            vision,
            flight_state,
            config,
            history: Vec::new(),
        }
    }

    /// Drain the queue until shutdown is requested or the producer side
    /// hangs up. Cancellation is cooperative, checked between actions.
    pub async fn run(
        mut self,
        mut queue: mpsc::UnboundedReceiver<Instruction>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Command executor started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Command executor shutting down");
                        break;
                    }
                }
                instruction = queue.recv() => match instruction {
                    Some(instruction) => self.handle(instruction).await,
                    None => {
                        debug!("Instruction queue closed");
                        break;
                    }
                }
            }
        }
        info!("Command executor stopped");
    }

    async fn handle(&mut self, instruction: Instruction) {
        let action = instruction.action.clone();
        info!("Executing '{}': {}", action.kind(), instruction.text);

        // Internally produced actions go through the same range checks as
        // translated ones. Rejections are final; nothing is clamped.
        if let Err(e) = validate(&action) {
            error!("Rejected '{}': {}", action.kind(), e);
            return;
        }

        if !is_safe(&action) {
            warn!("'{}' bypasses safety checks", action.kind());
        }

        // Advisory only; surfaced, never blocking
        for warning in check_sequence(&self.history, self.flight_state.get(), &action) {
            warn!("Sequence warning: {}", warning);
        }

        let text = instruction.text.to_lowercase();
        let wants_vision =
            action.wants_vision() || VISION_KEYWORDS.iter().any(|k| text.contains(k));
        if wants_vision {
            self.vision.set_assist(true);
            debug!("Vision assist enabled for this action");
        }

        // Optimistic state tracking: airborne is recorded before the
        // takeoff dispatch so the fail-safe supervisor can never observe
        // a stale grounded state mid-climb.
        if matches!(action, Action::Takeoff) {
            self.flight_state.mark_airborne();
        }

        let ok = if is_sweep_trigger(&action, &text) {
            let report = sweep::run_sweep(
                self.controller.as_ref(),
                &self.vision,
                self.config.sweep_settle,
            )
            .await;
            report.steps_completed > 0
        } else {
            self.controller.execute(&action).await
        };

        // Land and emergency end grounded regardless of the reply; the
        // supervisor must not re-land a vehicle we already told to land.
        if matches!(action, Action::Land | Action::EmergencyStop) {
            self.flight_state.mark_grounded();
        }

        self.history.push(action.clone());
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }

        if ok {
            info!("Action '{}' completed", action.kind());
        } else {
            // A single failed command must not halt the mission
            error!("Action '{}' failed; continuing with queue", action.kind());
        }

        if wants_vision && !CONTINUOUS_KEYWORDS.iter().any(|k| text.contains(k)) {
            self.vision.set_assist(false);
            debug!("Vision assist disabled");
        }
    }
}

/// A sweep is a clockwise rotation whose originating instruction asks for
/// a full circle with perception intent. A plain full-circle rotation
/// ("rotate 360 degrees") is one command, not a sweep.
fn is_sweep_trigger(action: &Action, text_lower: &str) -> bool {
    matches!(action, Action::Rotate { angle_deg } if *angle_deg > 0)
        && text_lower.contains("360")
        && PERCEPTION_KEYWORDS.iter().any(|k| text_lower.contains(k))
}
