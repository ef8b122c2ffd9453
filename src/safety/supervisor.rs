//! Fail-safe supervisor
//!
//! On every teardown path - normal exit, unhandled error, external
//! interrupt - this attempts a bounded-time landing if the vehicle is
//! still airborne, escalating to an emergency stop if landing fails.
//! It records the outcome but never raises; the remaining cleanup
//! (socket release, resource deallocation) must always proceed.

use crate::drone::DroneController;
use std::sync::Arc;
use std::time::Duration;
use tello_shared::{safety, Action, FlightStateHandle};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub struct FailsafeSupervisor {
    controller: Arc<dyn DroneController>,
    flight_state: Arc<FlightStateHandle>,
    land_timeout: Duration,
}

impl FailsafeSupervisor {
    pub fn new(controller: Arc<dyn DroneController>, flight_state: Arc<FlightStateHandle>) -> Self {
        Self {
            controller,
            flight_state,
            land_timeout: safety::FAILSAFE_LAND_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_land_timeout(mut self, land_timeout: Duration) -> Self {
        self.land_timeout = land_timeout;
        self
    }

    /// Run the fail-safe once. Racing shutdown triggers are collapsed by
    /// the atomic check-and-clear on the flight state: only the first
    /// caller that observes airborne dispatches a landing.
    pub async fn run(&self) {
        if !self.flight_state.take_if_airborne() {
            debug!("Vehicle grounded at shutdown; no fail-safe needed");
            return;
        }

        warn!("Vehicle airborne at shutdown - attempting fail-safe landing");

        match timeout(self.land_timeout, self.controller.execute(&Action::Land)).await {
            Ok(true) => {
                info!("Fail-safe landing succeeded");
                return;
            }
            Ok(false) => warn!("Fail-safe landing failed; escalating to emergency stop"),
            Err(_) => warn!(
                "Fail-safe landing exceeded {:?}; escalating to emergency stop",
                self.land_timeout
            ),
        }

        // Last escalation step: fire-and-forget, allowed to fail silently
        if self.controller.execute(&Action::EmergencyStop).await {
            warn!("Emergency stop dispatched");
        } else {
            error!("Emergency stop dispatch failed; continuing cleanup");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingController {
        lands: AtomicU32,
        emergencies: AtomicU32,
        land_succeeds: bool,
        land_delay: Option<Duration>,
    }

    #[async_trait]
    impl DroneController for CountingController {
        async fn execute(&self, action: &Action) -> bool {
            match action {
                Action::Land => {
                    self.lands.fetch_add(1, Ordering::SeqCst);
                    if let Some(delay) = self.land_delay {
                        tokio::time::sleep(delay).await;
                    }
                    self.land_succeeds
                }
                Action::EmergencyStop => {
                    self.emergencies.fetch_add(1, Ordering::SeqCst);
                    true
                }
                _ => true,
            }
        }
    }

    fn airborne_state() -> Arc<FlightStateHandle> {
        let state = Arc::new(FlightStateHandle::new());
        state.mark_airborne();
        state
    }

    #[tokio::test]
    async fn test_lands_when_airborne() {
        let controller = Arc::new(CountingController {
            land_succeeds: true,
            ..Default::default()
        });
        let state = airborne_state();
        let supervisor = FailsafeSupervisor::new(controller.clone(), state.clone());

        supervisor.run().await;

        assert_eq!(controller.lands.load(Ordering::SeqCst), 1);
        assert_eq!(controller.emergencies.load(Ordering::SeqCst), 0);
        assert_eq!(state.get(), tello_shared::FlightState::Grounded);
    }

    #[tokio::test]
    async fn test_noop_when_grounded() {
        let controller = Arc::new(CountingController {
            land_succeeds: true,
            ..Default::default()
        });
        let state = Arc::new(FlightStateHandle::new());
        let supervisor = FailsafeSupervisor::new(controller.clone(), state);

        supervisor.run().await;

        assert_eq!(controller.lands.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_double_shutdown_dispatches_one_landing() {
        let controller = Arc::new(CountingController {
            land_succeeds: true,
            ..Default::default()
        });
        let state = airborne_state();
        let supervisor =
            Arc::new(FailsafeSupervisor::new(controller.clone(), state));

        let a = supervisor.clone();
        let b = supervisor.clone();
        tokio::join!(a.run(), b.run());

        assert_eq!(controller.lands.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_escalates_when_land_fails() {
        let controller = Arc::new(CountingController {
            land_succeeds: false,
            ..Default::default()
        });
        let state = airborne_state();
        let supervisor = FailsafeSupervisor::new(controller.clone(), state);

        supervisor.run().await;

        assert_eq!(controller.lands.load(Ordering::SeqCst), 1);
        assert_eq!(controller.emergencies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_escalates_when_land_times_out() {
        let controller = Arc::new(CountingController {
            land_succeeds: true,
            land_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let state = airborne_state();
        let supervisor = FailsafeSupervisor::new(controller.clone(), state)
            .with_land_timeout(Duration::from_millis(50));

        supervisor.run().await;

        assert_eq!(controller.emergencies.load(Ordering::SeqCst), 1);
    }
}
