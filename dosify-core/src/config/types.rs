//! Configuration type definitions

use dosify_hal::PwmConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Intensity used until the first `set_intensity` call
pub const DEFAULT_INTENSITY_PERCENT: u8 = 75;

/// Lower bound for the runtime watchdog (seconds)
pub const MIN_RUNTIME_S: u32 = 30;

/// Upper bound for the runtime watchdog (seconds)
pub const MAX_RUNTIME_S: u32 = 600;

/// Runtime watchdog used until the first `set_max_runtime_secs` call
pub const DEFAULT_RUNTIME_S: u32 = 300;

/// H-bridge enable PWM frequency
pub const PWM_FREQUENCY_HZ: u32 = 1_000;

/// H-bridge enable PWM resolution (duty 0-255)
pub const PWM_RESOLUTION_BITS: u8 = 8;

/// Duty increment per ramp step
pub const RAMP_STEP: u16 = 10;

/// Time between ramp steps
pub const RAMP_INTERVAL_MS: u32 = 20;

/// Vibration motor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotorConfig {
    /// PWM frequency in Hz
    pub pwm_frequency_hz: u32,
    /// PWM resolution in bits
    pub pwm_resolution_bits: u8,
    /// Duty change per ramp step (0 is treated as 1)
    pub ramp_step: u16,
    /// Delay after each ramp step in ms
    pub ramp_interval_ms: u32,
    /// Initial intensity percentage
    pub default_intensity: u8,
    /// Initial runtime ceiling in seconds
    pub default_max_runtime_s: u32,
}

impl MotorConfig {
    /// PWM settings for the enable channel
    pub fn pwm(&self) -> PwmConfig {
        PwmConfig {
            frequency_hz: self.pwm_frequency_hz,
            resolution_bits: self.pwm_resolution_bits,
        }
    }

    /// Maximum duty value at the configured resolution
    pub fn max_duty(&self) -> u16 {
        self.pwm().max_duty()
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            pwm_frequency_hz: PWM_FREQUENCY_HZ,
            pwm_resolution_bits: PWM_RESOLUTION_BITS,
            ramp_step: RAMP_STEP,
            ramp_interval_ms: RAMP_INTERVAL_MS,
            default_intensity: DEFAULT_INTENSITY_PERCENT,
            default_max_runtime_s: DEFAULT_RUNTIME_S,
        }
    }
}
