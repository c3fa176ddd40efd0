//! Configuration management
//!
//! Motor tuning and safety limits. The firmware fills these from its board
//! file; host tests use the defaults.

pub mod types;

pub use types::*;
