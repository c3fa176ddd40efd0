//! Board configuration
//!
//! Constants generated from dispenser.toml at build time, plus the pin
//! assignments for the reference board.
//!
//! Pins (Raspberry Pi Pico + L298N):
//! - GPIO16 (PWM0 A): bridge ENA
//! - GPIO17: bridge IN1
//! - GPIO18: bridge IN2

use dosify_core::config::MotorConfig;

include!(concat!(env!("OUT_DIR"), "/board_config.rs"));

/// Motor settings from dispenser.toml
pub fn motor_config() -> MotorConfig {
    MotorConfig {
        pwm_frequency_hz: PWM_FREQUENCY_HZ,
        pwm_resolution_bits: PWM_RESOLUTION_BITS,
        ramp_step: RAMP_STEP,
        ramp_interval_ms: RAMP_INTERVAL_MS,
        default_intensity: DEFAULT_INTENSITY,
        default_max_runtime_s: DEFAULT_MAX_RUNTIME_S,
    }
}
