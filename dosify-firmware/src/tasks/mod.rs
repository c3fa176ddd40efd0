//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod motor;
pub mod persistence;

pub use motor::{motor_task, Motor};
pub use persistence::{persistence_task, JobSlot, SharedRecord};
