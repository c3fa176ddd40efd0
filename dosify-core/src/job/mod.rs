//! Job persistence
//!
//! The job slot holds at most one in-progress job. It is written when a
//! job is accepted, checkpointed after each item, cleared on completion,
//! and read back at boot to resume after a power loss.

mod record;
mod store;

pub use record::{BoundedText, CapacityError, JobProgressRecord, LOG_CAPACITY, PAYLOAD_CAPACITY};
pub use store::{JobStore, JobStoreError};
