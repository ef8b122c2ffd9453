//! Flight State Machine
//!
//! Tracks whether the controller believes the vehicle is airborne. The
//! state is optimistic: it is updated at dispatch time, before the vehicle
//! confirms, so the fail-safe supervisor can never observe a stale
//! grounded state while the vehicle is actually climbing.

use crate::action::Action;
use std::sync::Mutex;

/// The vehicle's tracked airborne/grounded status as understood by the
/// controller. Not guaranteed to match physical reality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Grounded,
    Airborne,
}

impl FlightState {
    /// The state after dispatching an action.
    ///
    /// Takeoff while airborne is a no-op at the state level (the validator
    /// only warns); land and emergency stop always end grounded.
    pub fn after(self, action: &Action) -> FlightState {
        match action {
            Action::Takeoff => FlightState::Airborne,
            Action::Land | Action::EmergencyStop => FlightState::Grounded,
            _ => self,
        }
    }
}

/// Shared, mutex-guarded flight state.
///
/// Owned by the executor and passed by reference to the fail-safe
/// supervisor; every reader goes through the same lock as the writer.
#[derive(Debug)]
pub struct FlightStateHandle {
    inner: Mutex<FlightState>,
}

impl FlightStateHandle {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FlightState::Grounded),
        }
    }

    pub fn get(&self) -> FlightState {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply the state effect of a dispatched action
    pub fn apply(&self, action: &Action) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *state = state.after(action);
    }

    pub fn mark_airborne(&self) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = FlightState::Airborne;
    }

    pub fn mark_grounded(&self) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = FlightState::Grounded;
    }

    /// Atomically check for airborne and clear to grounded.
    ///
    /// Returns true only for the first caller while airborne, which gives
    /// the fail-safe supervisor exactly-once semantics under racing
    /// shutdown triggers.
    pub fn take_if_airborne(&self) -> bool {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if *state == FlightState::Airborne {
            *state = FlightState::Grounded;
            true
        } else {
            false
        }
    }
}

impl Default for FlightStateHandle {
    fn default() -> Self {
        Self::new()
    }
}
