//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in dosify-core, built on the chip-agnostic primitives of dosify-hal:
//!
//! - H-bridge vibration motor driver (PWM enable plus two direction inputs)

#![no_std]
#![deny(unsafe_code)]

pub mod hbridge;

pub use hbridge::HBridge;
