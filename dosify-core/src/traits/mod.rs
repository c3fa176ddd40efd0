//! Hardware abstraction traits
//!
//! These traits define the interface between the controller logic
//! and hardware-specific implementations.

pub mod actuation;
pub mod clock;

pub use actuation::{ActuationPort, Direction};
pub use clock::Clock;
