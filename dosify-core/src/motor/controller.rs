//! Vibration motor safety controller
//!
//! This controller provides:
//! - Intensity control (0-100%) mapped onto the PWM duty range
//! - Stepped ramp-up/ramp-down to avoid H-bridge current spikes
//! - A runtime ceiling enforced by polling [`MotorController::check_timeout`]
//! - An unramped emergency stop
//!
//! # Usage
//!
//! `start` and `stop` suspend the calling task for the pre/post delay plus
//! the ramp. The owner must poll `check_timeout` from its own loop at a
//! sub-second interval; the controller has no timers of its own.
//!
//! ```ignore
//! let mut motor = MotorController::new(bridge, clock, Delay, MotorConfig::default());
//! motor.init();
//! motor.set_intensity(80);
//! motor.start(0).await;
//!
//! loop {
//!     if motor.check_timeout() {
//!         // mark the current item failed
//!         break;
//!     }
//!     Timer::after_millis(100).await;
//! }
//! motor.stop(500).await;
//! ```

use embedded_hal_async::delay::DelayNs;

use super::ramp::Ramp;
use super::state::{clamp_intensity, clamp_runtime_ms, percent_to_duty, MotorPhase, MotorState};
use crate::config::MotorConfig;
use crate::traits::{ActuationPort, Clock, Direction};

/// Vibration motor controller
///
/// Exclusively owns the actuation port. Every duty change goes through
/// [`Ramp`] except [`MotorController::force_stop`].
pub struct MotorController<P, C, D> {
    port: P,
    clock: C,
    delay: D,
    config: MotorConfig,
    state: MotorState,
}

impl<P, C, D> MotorController<P, C, D>
where
    P: ActuationPort,
    C: Clock,
    D: DelayNs,
{
    /// Create a new controller
    ///
    /// Hardware is not touched until [`MotorController::init`].
    pub fn new(port: P, clock: C, delay: D, config: MotorConfig) -> Self {
        Self {
            port,
            clock,
            delay,
            state: MotorState::new(&config),
            config,
        }
    }

    /// Configure the bridge and force the motor off
    ///
    /// Direction is fixed forward for the lifetime of the controller.
    /// Safe to call again; it always leaves the motor idle at duty 0.
    pub fn init(&mut self) {
        self.port.configure(self.config.pwm());
        self.port.set_direction(Direction::Forward);
        self.port.set_duty(0);

        self.state.current_duty = 0;
        self.state.phase = MotorPhase::Idle;

        info!(
            "Motor initialized: {} Hz, {}-bit PWM",
            self.config.pwm_frequency_hz,
            self.config.pwm_resolution_bits
        );
    }

    /// Set the steady-state intensity (clamped to 0-100%)
    ///
    /// Takes effect on the next `start`.
    pub fn set_intensity(&mut self, percent: i32) {
        self.state.intensity_percent = clamp_intensity(percent);
        info!("Motor intensity set: {}%", self.state.intensity_percent);
    }

    /// Set the runtime ceiling (clamped to 30-600 s)
    pub fn set_max_runtime_secs(&mut self, seconds: i32) {
        self.state.max_runtime_ms = clamp_runtime_ms(seconds);
        debug!("Motor max runtime set: {} ms", self.state.max_runtime_ms);
    }

    /// Ramp the motor up to the commanded intensity
    ///
    /// Ignored if already running or if intensity is 0%. Otherwise waits
    /// `pre_delay_ms`, ramps to the target duty, then opens the watchdog
    /// window.
    pub async fn start(&mut self, pre_delay_ms: u32) {
        if self.state.is_running() {
            warn!("Motor start ignored: already running");
            return;
        }

        if self.state.intensity_percent == 0 {
            warn!("Motor start ignored: intensity is 0%");
            return;
        }

        info!(
            "Motor starting (pre-delay: {} ms, intensity: {}%)",
            pre_delay_ms,
            self.state.intensity_percent
        );

        if pre_delay_ms > 0 {
            self.delay.delay_ms(pre_delay_ms).await;
        }

        let target = self.target_duty();
        self.ramp_to(target).await;

        self.state.phase = MotorPhase::Running {
            started_at_ms: self.clock.now_ms(),
        };

        info!("Motor running at duty {}", self.state.current_duty);
    }

    /// Ramp the motor down to 0
    ///
    /// Ignored if not running. The motor keeps spinning at its current duty
    /// for `post_delay_ms` before the ramp begins.
    pub async fn stop(&mut self, post_delay_ms: u32) {
        if !self.state.is_running() {
            warn!("Motor stop ignored: already stopped");
            return;
        }

        info!("Motor stopping (post-delay: {} ms)", post_delay_ms);

        if post_delay_ms > 0 {
            self.delay.delay_ms(post_delay_ms).await;
        }

        self.ramp_to(0).await;
        self.state.phase = MotorPhase::Idle;

        info!("Motor stopped");
    }

    /// Cut the motor immediately, without ramping
    ///
    /// Ignored if not running.
    pub fn force_stop(&mut self) {
        if !self.state.is_running() {
            return;
        }

        warn!("Motor EMERGENCY STOP");
        self.port.set_duty(0);
        self.state.current_duty = 0;
        self.state.phase = MotorPhase::Idle;
    }

    /// Enforce the runtime ceiling
    ///
    /// Returns `true` exactly when this call found the ceiling exceeded and
    /// forced the motor off. The caller should treat that as a fault for the
    /// current item.
    pub fn check_timeout(&mut self) -> bool {
        let MotorPhase::Running { started_at_ms } = self.state.phase else {
            return false;
        };

        let elapsed = self.clock.now_ms().wrapping_sub(started_at_ms);
        if elapsed < self.state.max_runtime_ms {
            return false;
        }

        error!(
            "Motor TIMEOUT after {} ms (limit {} ms), shutting down",
            elapsed,
            self.state.max_runtime_ms
        );
        self.force_stop();
        true
    }

    /// Check if the motor is running
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Commanded intensity percentage
    pub fn intensity(&self) -> u8 {
        self.state.intensity_percent
    }

    /// Time since the current run reached full duty, or 0 when idle
    pub fn runtime_elapsed_ms(&self) -> u32 {
        match self.state.phase {
            MotorPhase::Running { started_at_ms } => {
                self.clock.now_ms().wrapping_sub(started_at_ms)
            }
            MotorPhase::Idle => 0,
        }
    }

    /// Clock time the current run reached full duty, or 0 when idle
    pub fn started_at_ms(&self) -> u32 {
        self.state.started_at_ms()
    }

    /// Runtime ceiling in ms
    pub fn max_runtime_ms(&self) -> u32 {
        self.state.max_runtime_ms
    }

    /// Last duty value written to the port
    pub fn current_duty(&self) -> u16 {
        self.state.current_duty
    }

    /// Duty value `start` ramps to at the current intensity
    ///
    /// Scaled to the range the port reports after `init`.
    pub fn target_duty(&self) -> u16 {
        percent_to_duty(self.state.intensity_percent, self.port.max_duty())
    }

    /// Snapshot of the controller state
    pub fn state(&self) -> MotorState {
        self.state
    }

    /// Get the configuration
    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// Get the actuation port
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Step the duty from its current value to `target`, writing every step
    async fn ramp_to(&mut self, target: u16) {
        let ramp = Ramp::new(self.state.current_duty, target, self.config.ramp_step);
        trace!(
            "Ramp {} -> {} in {} ms",
            self.state.current_duty,
            target,
            ramp.duration_ms(self.config.ramp_interval_ms)
        );

        for duty in ramp {
            self.port.set_duty(duty);
            self.state.current_duty = duty;
            self.delay.delay_ms(self.config.ramp_interval_ms).await;
        }
    }
}
