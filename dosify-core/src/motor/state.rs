//! Motor state and input clamping

use crate::config::{MotorConfig, MAX_RUNTIME_S, MIN_RUNTIME_S};

/// Externally observable motor phase
///
/// Ramping happens inside `start`/`stop` and is never observed as a phase
/// of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorPhase {
    /// Motor stopped
    #[default]
    Idle,
    /// Motor at commanded duty; the watchdog window opened at `started_at_ms`
    Running { started_at_ms: u32 },
}

/// Motor state owned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorState {
    /// Commanded steady-state intensity (0-100%)
    pub intensity_percent: u8,
    /// Last duty value written to hardware
    pub current_duty: u16,
    /// Idle or running
    pub phase: MotorPhase,
    /// Watchdog ceiling in ms
    pub max_runtime_ms: u32,
}

impl MotorState {
    /// Initial state for a configuration
    pub fn new(config: &MotorConfig) -> Self {
        Self {
            intensity_percent: clamp_intensity(config.default_intensity as i32),
            current_duty: 0,
            phase: MotorPhase::Idle,
            max_runtime_ms: clamp_runtime_ms(config.default_max_runtime_s as i32),
        }
    }

    /// Check if the motor is running
    pub fn is_running(&self) -> bool {
        matches!(self.phase, MotorPhase::Running { .. })
    }

    /// Start timestamp of the current run, or 0 when idle
    pub fn started_at_ms(&self) -> u32 {
        match self.phase {
            MotorPhase::Running { started_at_ms } => started_at_ms,
            MotorPhase::Idle => 0,
        }
    }
}

/// Clamp an intensity request to 0-100%
pub fn clamp_intensity(percent: i32) -> u8 {
    percent.clamp(0, 100) as u8
}

/// Clamp a runtime request to the watchdog bounds and convert to ms
pub fn clamp_runtime_ms(seconds: i32) -> u32 {
    let seconds = seconds.clamp(MIN_RUNTIME_S as i32, MAX_RUNTIME_S as i32) as u32;
    seconds * 1000
}

/// Convert an intensity percentage to a duty value, rounded to nearest
pub fn percent_to_duty(percent: u8, max_duty: u16) -> u16 {
    let percent = percent.min(100) as u32;
    ((percent * max_duty as u32 + 50) / 100) as u16
}
