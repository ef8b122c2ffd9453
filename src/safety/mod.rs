//! Fail-safe teardown
//!
//! Guarantees the vehicle is never left uncommanded mid-air when the
//! process is shutting down, whatever the trigger.

mod supervisor;

pub use supervisor::FailsafeSupervisor;
