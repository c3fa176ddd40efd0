//! H-bridge vibration motor driver
//!
//! Drives an L298N-style bridge: the enable input takes the PWM signal and
//! the two direction inputs select the rotation. The vibration motor only
//! ever runs forward, but both levels are driven explicitly so the bridge
//! never floats.
//!
//! ```ignore
//! let port = HBridge::new(enable_pwm, in1, in2);
//! let mut motor = MotorController::new(port, clock, delay, MotorConfig::default());
//! motor.init();
//! ```

use dosify_core::traits::{ActuationPort, Direction};
use dosify_hal::{OutputPin, PwmConfig, PwmOutput};

/// H-bridge with a PWM enable channel and two direction pins
pub struct HBridge<EN, IN1, IN2> {
    enable: EN,
    in1: IN1,
    in2: IN2,
    direction: Direction,
}

impl<EN, IN1, IN2> HBridge<EN, IN1, IN2>
where
    EN: PwmOutput,
    IN1: OutputPin,
    IN2: OutputPin,
{
    /// Create a new driver
    ///
    /// Outputs are left untouched until [`ActuationPort::configure`] and
    /// [`ActuationPort::set_direction`] are called.
    pub fn new(enable: EN, in1: IN1, in2: IN2) -> Self {
        Self {
            enable,
            in1,
            in2,
            direction: Direction::Forward,
        }
    }

    /// Last direction written to the bridge
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current duty on the enable channel
    pub fn duty(&self) -> u16 {
        self.enable.duty()
    }

    /// Release the pins
    pub fn release(self) -> (EN, IN1, IN2) {
        (self.enable, self.in1, self.in2)
    }
}

impl<EN, IN1, IN2> ActuationPort for HBridge<EN, IN1, IN2>
where
    EN: PwmOutput,
    IN1: OutputPin,
    IN2: OutputPin,
{
    fn configure(&mut self, config: PwmConfig) {
        self.enable.configure(config);
    }

    fn set_direction(&mut self, direction: Direction) {
        match direction {
            Direction::Forward => {
                self.in1.set_high();
                self.in2.set_low();
            }
            Direction::Reverse => {
                self.in1.set_low();
                self.in2.set_high();
            }
        }
        self.direction = direction;
    }

    fn set_duty(&mut self, duty: u16) {
        self.enable.set_duty(duty);
    }

    fn max_duty(&self) -> u16 {
        self.enable.max_duty()
    }
}
