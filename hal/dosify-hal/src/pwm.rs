//! PWM channel abstraction
//!
//! Duty values are expressed in the logical resolution the channel was
//! configured with (0..=255 for 8 bits), independent of how the chip's
//! counter is actually laid out.

/// PWM channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmConfig {
    /// Output frequency in Hz
    pub frequency_hz: u32,
    /// Logical duty resolution in bits (1-16)
    pub resolution_bits: u8,
}

impl PwmConfig {
    /// Largest duty value representable at this resolution
    pub fn max_duty(&self) -> u16 {
        let bits = self.resolution_bits.clamp(1, 16) as u32;
        ((1u32 << bits) - 1) as u16
    }
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1_000,
            resolution_bits: 8,
        }
    }
}

/// PWM output channel
///
/// Attached to a single pin. Implementations translate the logical duty
/// into their compare register.
pub trait PwmOutput {
    /// Apply frequency and resolution, leaving the output at 0% duty
    fn configure(&mut self, config: PwmConfig);

    /// Set the duty cycle in logical units, clamped to [`PwmOutput::max_duty`]
    fn set_duty(&mut self, duty: u16);

    /// Current duty cycle in logical units
    fn duty(&self) -> u16;

    /// Maximum logical duty for the active configuration
    fn max_duty(&self) -> u16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_duty_for_resolution() {
        let config = PwmConfig::default();
        assert_eq!(config.max_duty(), 255);

        let config = PwmConfig {
            frequency_hz: 20_000,
            resolution_bits: 10,
        };
        assert_eq!(config.max_duty(), 1023);

        let config = PwmConfig {
            frequency_hz: 1_000,
            resolution_bits: 16,
        };
        assert_eq!(config.max_duty(), u16::MAX);
    }

    #[test]
    fn test_max_duty_clamps_resolution() {
        let config = PwmConfig {
            frequency_hz: 1_000,
            resolution_bits: 0,
        };
        assert_eq!(config.max_duty(), 1);

        let config = PwmConfig {
            frequency_hz: 1_000,
            resolution_bits: 32,
        };
        assert_eq!(config.max_duty(), u16::MAX);
    }
}
