mod controller;

pub use controller::{DroneController, TelloController};
