//! Command execution for the agent
//!
//! This module handles:
//! - Draining the queue of translated actions, one at a time
//! - Safety validation and advisory sequence warnings
//! - VisionAssist and flight state tracking
//! - The rotate-and-sample sweep choreography

mod executor;
mod sweep;

pub use executor::{CommandExecutor, ExecutorConfig, Instruction};
pub use sweep::{SweepDetection, SweepReport};
