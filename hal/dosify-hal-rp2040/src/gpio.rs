//! GPIO output wrapper

use embassy_rp::gpio::{Level, Output, Pin};
use embassy_rp::Peri;

/// Push-pull output implementing [`dosify_hal::OutputPin`]
pub struct Rp2040OutputPin<'d> {
    pin: Output<'d>,
}

impl<'d> Rp2040OutputPin<'d> {
    /// Take a pin as an output, starting low
    pub fn new(pin: Peri<'d, impl Pin>) -> Self {
        Self {
            pin: Output::new(pin, Level::Low),
        }
    }
}

impl dosify_hal::OutputPin for Rp2040OutputPin<'_> {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}
