//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

/// Channel capacity for motor commands
const MOTOR_CHANNEL_SIZE: usize = 4;

/// Channel capacity for persistence commands
const PERSIST_CHANNEL_SIZE: usize = 8;

/// Motor commands from the job runner
#[allow(dead_code)] // Start/Stop are sent by the job runner integration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorCommand {
    /// Ramp up after `pre_delay_ms`
    Start {
        /// Intensity percentage (clamped by the controller)
        intensity_percent: u8,
        /// Runtime ceiling in seconds (clamped by the controller)
        max_runtime_s: u16,
        /// Settle time before the ramp
        pre_delay_ms: u32,
    },
    /// Hold the current duty for `post_delay_ms`, then ramp down
    Stop {
        /// Time to keep running before the ramp
        post_delay_ms: u32,
    },
    /// Cut the duty immediately
    ForceStop,
}

/// Job slot updates
///
/// The job runner edits the shared record and then sends one of these to
/// have it written.
#[allow(dead_code)] // Only ItemFailed is sent from inside this firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistCommand {
    /// Write the whole record (new job accepted)
    Save,
    /// Count one dispensed item and checkpoint the counters
    ItemCompleted,
    /// Count one failed item and checkpoint the counters
    ItemFailed,
    /// Write the execution log
    SaveLog,
    /// Erase the job slot
    Clear,
}

/// Job slot summary, published after boot recovery and every update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JobStatus {
    /// Job id (0 = none)
    pub job_id: u32,
    /// Items in the job
    pub total_items: u32,
    /// Items still to process
    pub remaining_items: u32,
}

/// Motor commands (consumed by the motor task)
pub static MOTOR_CMD: Channel<CriticalSectionRawMutex, MotorCommand, MOTOR_CHANNEL_SIZE> =
    Channel::new();

/// Persistence commands (consumed by the persistence task)
pub static PERSIST_CMD: Channel<CriticalSectionRawMutex, PersistCommand, PERSIST_CHANNEL_SIZE> =
    Channel::new();

/// Latest job slot status (updated by the persistence task)
pub static JOB_STATUS: Signal<CriticalSectionRawMutex, JobStatus> = Signal::new();
