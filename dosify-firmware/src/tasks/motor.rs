//! Vibration motor task
//!
//! Owns the motor controller. Executes motor commands in order and polls
//! the runtime watchdog between them. A start or stop ramp runs to
//! completion before the next command is read.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Delay, Duration, Ticker};

use dosify_core::motor::MotorController;
use dosify_drivers::HBridge;
use dosify_hal_rp2040::{EmbassyClock, Rp2040OutputPin, Rp2040Pwm};

use crate::board::WATCHDOG_POLL_MS;
use crate::channels::{MotorCommand, PersistCommand, MOTOR_CMD, PERSIST_CMD};

/// Motor controller as wired on the board
pub type Motor = MotorController<
    HBridge<Rp2040Pwm<'static>, Rp2040OutputPin<'static>, Rp2040OutputPin<'static>>,
    EmbassyClock,
    Delay,
>;

/// Motor control task
///
/// The watchdog tick keeps running while the task waits for commands, so
/// a motor left running by a stalled job runner is still stopped on time.
#[embassy_executor::task]
pub async fn motor_task(mut motor: Motor) {
    info!("Motor task started");

    motor.init();

    let mut ticker = Ticker::every(Duration::from_millis(WATCHDOG_POLL_MS));

    loop {
        match select(MOTOR_CMD.receive(), ticker.next()).await {
            Either::First(cmd) => handle_command(&mut motor, cmd).await,
            Either::Second(()) => {
                if motor.check_timeout() {
                    // The item that was dispensing is lost
                    PERSIST_CMD.send(PersistCommand::ItemFailed).await;
                }
            }
        }
    }
}

async fn handle_command(motor: &mut Motor, cmd: MotorCommand) {
    debug!("Motor command: {:?}", cmd);

    match cmd {
        MotorCommand::Start {
            intensity_percent,
            max_runtime_s,
            pre_delay_ms,
        } => {
            motor.set_intensity(i32::from(intensity_percent));
            motor.set_max_runtime_secs(i32::from(max_runtime_s));
            motor.start(pre_delay_ms).await;
        }
        MotorCommand::Stop { post_delay_ms } => {
            motor.stop(post_delay_ms).await;
        }
        MotorCommand::ForceStop => {
            motor.force_stop();
        }
    }
}
