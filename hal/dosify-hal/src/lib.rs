//! Dosify Hardware Abstraction Layer
//!
//! This crate defines the peripheral traits the dispenser core is built on.
//! Chip-specific HALs implement them so the motor controller and the job
//! store can run on real hardware or against in-memory doubles on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  dosify-firmware                        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  dosify-core / dosify-drivers           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  dosify-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!           ┌───────────────────┐
//!           │ dosify-hal-rp2040 │
//!           └───────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital output (H-bridge direction inputs)
//! - [`pwm::PwmOutput`] - PWM channel (H-bridge enable)
//! - [`storage::KeyValueStore`] - Namespaced non-volatile key/value storage

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod pwm;
pub mod storage;

// Re-export key traits at crate root for convenience
pub use gpio::OutputPin;
pub use pwm::{PwmConfig, PwmOutput};
pub use storage::{KeyValueStore, StorageError, StorageKey};
