//! PWM slice driver
//!
//! The RP2040 PWM slice counts from 0 to `top` at `clk_sys / divider`.
//! The requested frequency picks the smallest integer divider that keeps
//! `top` within 16 bits, which gives the finest compare resolution
//! available. Logical duty (0..=`max_duty`) is then scaled onto the
//! compare register, so 8-bit callers see 8-bit behaviour regardless of
//! the counter width.

use dosify_hal::{PwmConfig, PwmOutput};
use embassy_rp::pwm::{Config, Pwm};
use fixed::types::extra::U4;
use fixed::FixedU16;

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// Slice counter settings for a target frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SliceTiming {
    /// Integer clock divider (1-255)
    pub divider: u8,
    /// Counter wrap value
    pub top: u16,
}

/// Calculate divider and wrap value for `freq_hz`
///
/// Frequencies too low for the slice clamp to the slowest achievable
/// period; 0 Hz is treated as 1 Hz.
pub fn calc_slice_timing(sys_clk_hz: u32, freq_hz: u32) -> SliceTiming {
    let freq_hz = freq_hz.max(1);
    let counts = (sys_clk_hz / freq_hz).max(1);

    let divider = counts.div_ceil(1 << 16).clamp(1, 255);
    let top = (counts / divider).clamp(1, 1 << 16) - 1;

    SliceTiming {
        divider: divider as u8,
        top: top as u16,
    }
}

/// Scale a logical duty onto the compare register
///
/// `max_duty` maps to `top + 1`, which holds the output high for the
/// whole period.
pub fn duty_to_compare(duty: u16, max_duty: u16, top: u16) -> u16 {
    if max_duty == 0 {
        return 0;
    }
    let duty = duty.min(max_duty) as u32;
    let compare = duty * (top as u32 + 1) / max_duty as u32;
    compare.min(u16::MAX as u32) as u16
}

/// PWM output on channel A of one slice
pub struct Rp2040Pwm<'d> {
    pwm: Pwm<'d>,
    config: Config,
    logical: PwmConfig,
    duty: u16,
}

impl<'d> Rp2040Pwm<'d> {
    /// Wrap a slice configured for channel A output
    ///
    /// The slice stays at its current settings until
    /// [`PwmOutput::configure`] is called.
    pub fn new(pwm: Pwm<'d>) -> Self {
        Self {
            pwm,
            config: Config::default(),
            logical: PwmConfig::default(),
            duty: 0,
        }
    }

    /// Counter settings currently applied
    pub fn timing(&self) -> SliceTiming {
        SliceTiming {
            divider: self.config.divider.to_num::<u8>(),
            top: self.config.top,
        }
    }
}

impl PwmOutput for Rp2040Pwm<'_> {
    fn configure(&mut self, config: PwmConfig) {
        let timing = calc_slice_timing(embassy_rp::clocks::clk_sys_freq(), config.frequency_hz);

        self.logical = config;
        self.duty = 0;
        self.config.divider = FixedU16::<U4>::from_num(timing.divider);
        self.config.top = timing.top;
        self.config.compare_a = 0;
        self.pwm.set_config(&self.config);
    }

    fn set_duty(&mut self, duty: u16) {
        self.duty = duty.min(self.logical.max_duty());
        self.config.compare_a = duty_to_compare(self.duty, self.logical.max_duty(), self.config.top);
        self.pwm.set_config(&self.config);
    }

    fn duty(&self) -> u16 {
        self.duty
    }

    fn max_duty(&self) -> u16 {
        self.logical.max_duty()
    }
}
