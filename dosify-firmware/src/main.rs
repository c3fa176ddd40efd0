//! Dosify - Ingredient Dispenser Firmware
//!
//! Main firmware binary for RP2040-based dispenser controllers. Drives the
//! vibration feeder motor through an H-bridge and keeps the progress of
//! the running job in flash so it survives a power loss.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_sync::mutex::Mutex;
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use dosify_core::job::{JobProgressRecord, JobStore};
use dosify_core::motor::MotorController;
use dosify_drivers::HBridge;
use dosify_hal_rp2040::{EmbassyClock, Rp2040KeyValueStore, Rp2040OutputPin, Rp2040Pwm};

mod board;
mod channels;
mod tasks;

// Job record shared between the persistence task and the job runner
static JOB_RECORD: StaticCell<tasks::SharedRecord> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Dosify firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Motor H-bridge
    // Pin assignment is board-specific (see board.rs)
    let enable = Pwm::new_output_a(p.PWM_SLICE0, p.PIN_16, PwmConfig::default());
    let bridge = HBridge::new(
        Rp2040Pwm::new(enable),
        Rp2040OutputPin::new(p.PIN_17),
        Rp2040OutputPin::new(p.PIN_18),
    );
    let motor = MotorController::new(bridge, EmbassyClock, Delay, board::motor_config());

    info!("Motor H-bridge initialized");

    // Job slot in the last 64KB of flash
    let flash = Rp2040KeyValueStore::new(p.FLASH, p.DMA_CH0);
    let store = JobStore::new(flash, EmbassyClock);
    let record = JOB_RECORD.init(Mutex::new(JobProgressRecord::default()));

    info!("Job store initialized");

    // Spawn tasks
    spawner.spawn(tasks::motor_task(motor)).unwrap();
    spawner
        .spawn(tasks::persistence_task(store, record))
        .unwrap();

    info!("All tasks spawned, firmware running");

    // Report job slot changes
    loop {
        let status = channels::JOB_STATUS.wait().await;
        if status.job_id == 0 {
            info!("Job slot empty");
        } else {
            info!(
                "Job {}: {} of {} items remaining",
                status.job_id, status.remaining_items, status.total_items
            );
        }
    }
}
