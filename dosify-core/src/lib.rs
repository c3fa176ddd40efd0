//! Board-agnostic core logic for the dispenser firmware
//!
//! This crate contains the parts of the dispenser with real invariants and
//! failure semantics, none of which depend on a specific chip:
//!
//! - Vibration motor controller (ramped start/stop, runtime watchdog,
//!   emergency stop)
//! - Job progress persistence and boot-time recovery
//! - Hardware abstraction traits consumed by the above
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This must go first so the logging macros are visible to later modules
mod fmt;

pub mod config;
pub mod job;
pub mod motor;
pub mod traits;
