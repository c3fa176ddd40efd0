//! Actuation port trait
//!
//! The capability set the motor controller drives: a PWM enable channel
//! plus direction inputs. An H-bridge driver implements it on hardware;
//! tests implement it with a recorder.

use dosify_hal::PwmConfig;

/// H-bridge rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// IN1 high, IN2 low
    #[default]
    Forward,
    /// IN1 low, IN2 high
    Reverse,
}

/// Motor actuation port
///
/// The controller is the only writer. Implementations are infallible: a
/// missing peripheral is a board bring-up bug, not a runtime condition.
pub trait ActuationPort {
    /// Configure the PWM channel and attach it to the enable pin
    fn configure(&mut self, config: PwmConfig);

    /// Set the bridge direction inputs
    fn set_direction(&mut self, direction: Direction);

    /// Write a duty value (0..=`max_duty`) to the enable channel
    fn set_duty(&mut self, duty: u16);

    /// Largest duty value the port accepts
    fn max_duty(&self) -> u16;
}
