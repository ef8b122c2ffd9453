//! Rotate-and-sample sweep choreography
//!
//! Decomposes a full-circle scan into 8 steps of 45 degrees: rotate, wait
//! for motion to stop and the perception sample to refresh, then record
//! whatever the latest snapshot reports, tagged with the cumulative angle.

use crate::drone::DroneController;
use crate::vision::VisionFeed;
use std::time::Duration;
use tello_shared::{safety, Action};
use tracing::{info, warn};

/// One object sighting during a sweep
#[derive(Debug, Clone)]
pub struct SweepDetection {
    /// Cumulative rotation when the sample was taken
    pub angle_deg: i32,
    pub label: String,
    pub confidence: f32,
}

/// Outcome of a full sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub detections: Vec<SweepDetection>,
    pub steps_completed: u32,
}

impl SweepReport {
    pub fn total_detections(&self) -> usize {
        self.detections.len()
    }
}

/// Run the full sweep. Rotation failures are logged and skipped; the
/// sweep carries on with the remaining steps.
pub async fn run_sweep(
    controller: &dyn DroneController,
    vision: &VisionFeed,
    settle: Duration,
) -> SweepReport {
    info!(
        "Starting {}-step sweep ({}° per step)",
        safety::SWEEP_STEPS,
        safety::SWEEP_STEP_DEG
    );
    vision.set_assist(true);

    let mut report = SweepReport::default();

    for step in 0..safety::SWEEP_STEPS {
        let angle = step as i32 * safety::SWEEP_STEP_DEG;
        info!(
            "Sweep step {}/{} at {}°",
            step + 1,
            safety::SWEEP_STEPS,
            angle
        );

        let rotate = Action::Rotate {
            angle_deg: safety::SWEEP_STEP_DEG,
        };
        if controller.execute(&rotate).await {
            report.steps_completed += 1;
        } else {
            warn!("Sweep rotation failed at step {}; continuing", step + 1);
        }

        // Let the rotation stop and the latest sample refresh. The read
        // below is best-effort and possibly stale; it is never awaited
        // beyond this fixed delay.
        tokio::time::sleep(settle).await;

        if let Some(analysis) = vision.snapshot() {
            if !analysis.objects.is_empty() {
                info!("At {}°: {} objects", angle, analysis.objects.len());
            }
            for obj in &analysis.objects {
                report.detections.push(SweepDetection {
                    angle_deg: angle,
                    label: obj.label.clone(),
                    confidence: obj.confidence,
                });
            }
        }
    }

    info!(
        "Sweep complete: {} detections across {} steps",
        report.total_detections(),
        report.steps_completed
    );
    for detection in &report.detections {
        info!("  {}°: {}", detection.angle_deg, detection.label);
    }

    report
}
