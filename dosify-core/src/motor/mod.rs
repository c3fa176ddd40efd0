//! Vibration motor control
//!
//! The feeder motor is driven through an H-bridge in a single direction.
//! Duty changes are ramped to keep inrush current down, and a runtime
//! ceiling cuts the motor if the caller never stops it.

pub mod controller;
pub mod ramp;
pub mod state;

pub use controller::MotorController;
pub use ramp::Ramp;
pub use state::{MotorPhase, MotorState};
