//! RP2040-specific HAL for the dispenser firmware
//!
//! This crate provides RP2040 implementations of the shared `dosify-hal`
//! traits and the `dosify-core` clock:
//!
//! - GPIO outputs for the H-bridge direction inputs
//! - PWM slice driver with logical duty resolution
//! - Flash key/value store for the job slot (implements
//!   `dosify_hal::KeyValueStore`)
//! - Millisecond clock backed by the embassy time driver

#![no_std]

pub mod clock;
pub mod flash;
pub mod gpio;
pub mod pwm;

// Re-export shared traits from dosify-hal for convenience
pub use dosify_hal::{KeyValueStore, StorageKey};

pub use clock::EmbassyClock;
pub use flash::Rp2040KeyValueStore;
pub use gpio::Rp2040OutputPin;
pub use pwm::Rp2040Pwm;
