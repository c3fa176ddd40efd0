//! Job slot persistence task
//!
//! Owns the flash job store. At boot it reloads any job that was running
//! when power was lost; afterwards it writes the shared record whenever a
//! `PersistCommand` arrives.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

use dosify_core::job::{JobProgressRecord, JobStore};
use dosify_hal_rp2040::{EmbassyClock, Rp2040KeyValueStore};

use crate::channels::{JobStatus, PersistCommand, JOB_STATUS, PERSIST_CMD};

/// Job store on the RP2040 flash partition
pub type JobSlot = JobStore<Rp2040KeyValueStore<'static>, EmbassyClock>;

/// In-memory job record shared with the job runner
pub type SharedRecord = Mutex<CriticalSectionRawMutex, JobProgressRecord>;

/// Persistence task
#[embassy_executor::task]
pub async fn persistence_task(mut store: JobSlot, record: &'static SharedRecord) {
    info!("Persistence task started");

    {
        let mut record = record.lock().await;
        if !store.recover(&mut record).await {
            info!("No job to resume");
        }
        JOB_STATUS.signal(status(&record));
    }

    loop {
        let cmd = PERSIST_CMD.receive().await;
        let mut record = record.lock().await;

        let result = match cmd {
            PersistCommand::Save => store.save(&record).await,
            PersistCommand::ItemCompleted | PersistCommand::ItemFailed => {
                if !record.is_present() {
                    warn!("{:?} ignored: no active job", cmd);
                    continue;
                }
                if cmd == PersistCommand::ItemCompleted {
                    record.record_completed();
                } else {
                    record.record_failed();
                }
                store.save_progress(&record).await
            }
            PersistCommand::SaveLog => store.save_log(&record).await,
            PersistCommand::Clear => {
                record.reset();
                store.clear().await
            }
        };

        if let Err(e) = result {
            error!("Job slot update {:?} failed: {:?}", cmd, e);
        }

        JOB_STATUS.signal(status(&record));
    }
}

fn status(record: &JobProgressRecord) -> JobStatus {
    JobStatus {
        job_id: record.job_id,
        total_items: record.total_items,
        remaining_items: record.remaining_items(),
    }
}
