//! Job slot persistence
//!
//! Writes the job record to the key/value store as seven independent
//! entries and reads it back at boot.
//!
//! There is no multi-key transaction. A crash in the middle of a save can
//! leave new counters next to an old payload; loading only checks that a
//! job id is present. `JobId` is written last so that a first save that
//! never completes leaves no job visible.

use dosify_hal::storage::MAX_VALUE_LEN;
use dosify_hal::{KeyValueStore, StorageError, StorageKey};

use super::record::{BoundedText, JobProgressRecord};
use crate::traits::Clock;

/// Job persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JobStoreError {
    /// Underlying storage operation failed
    Storage(StorageError),
    /// Job id 0 is reserved for "no job"
    InvalidJobId,
    /// A partial update needs a saved job, but the slot is empty
    NoJob,
    /// A partial update targeted a different job than the one saved
    JobMismatch {
        /// Job id in storage
        stored: u32,
        /// Job id of the record passed in
        requested: u32,
    },
}

impl From<StorageError> for JobStoreError {
    fn from(e: StorageError) -> Self {
        JobStoreError::Storage(e)
    }
}

/// Persistent job slot
///
/// Owns the storage backend for its namespace. Each operation runs to
/// completion before returning; no storage handle outlives a call.
pub struct JobStore<S, C> {
    storage: S,
    clock: C,
}

impl<S, C> JobStore<S, C>
where
    S: KeyValueStore,
    C: Clock,
{
    /// Create a job store over a storage backend
    pub fn new(storage: S, clock: C) -> Self {
        Self { storage, clock }
    }

    /// Consume the job store and return the underlying storage
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Write the whole record
    ///
    /// Rejects `job_id == 0`, which would read back as "no job".
    pub async fn save(&mut self, record: &JobProgressRecord) -> Result<(), JobStoreError> {
        if !record.is_present() {
            warn!("Refusing to save job with id 0");
            return Err(JobStoreError::InvalidJobId);
        }

        for key in StorageKey::ALL {
            match key {
                StorageKey::JobId => self.write_u32(key, record.job_id).await?,
                StorageKey::TotalItems => self.write_u32(key, record.total_items).await?,
                StorageKey::CompletedItems => self.write_u32(key, record.completed_items).await?,
                StorageKey::FailedItems => self.write_u32(key, record.failed_items).await?,
                StorageKey::StartedAt => self.write_u32(key, record.started_at_ms).await?,
                StorageKey::Payload => self.storage.write(key, record.payload.as_bytes()).await?,
                StorageKey::ExecutionLog => {
                    self.storage
                        .write(key, record.execution_log.as_bytes())
                        .await?
                }
            }
        }

        info!(
            "Job {} saved to flash (done: {}, failed: {})",
            record.job_id,
            record.completed_items,
            record.failed_items
        );
        Ok(())
    }

    /// Checkpoint the progress counters only
    ///
    /// The payload is written once by [`JobStore::save`] when the job is
    /// accepted; per-item checkpoints only rewrite the three counters.
    pub async fn save_progress(&mut self, record: &JobProgressRecord) -> Result<(), JobStoreError> {
        self.check_slot(record.job_id).await?;

        self.write_u32(StorageKey::TotalItems, record.total_items)
            .await?;
        self.write_u32(StorageKey::CompletedItems, record.completed_items)
            .await?;
        self.write_u32(StorageKey::FailedItems, record.failed_items)
            .await?;

        debug!(
            "Job {} checkpoint (done: {}, failed: {})",
            record.job_id,
            record.completed_items,
            record.failed_items
        );
        Ok(())
    }

    /// Rewrite the execution log entry only
    pub async fn save_log(&mut self, record: &JobProgressRecord) -> Result<(), JobStoreError> {
        self.check_slot(record.job_id).await?;

        self.storage
            .write(StorageKey::ExecutionLog, record.execution_log.as_bytes())
            .await?;

        debug!(
            "Job {} log saved ({} bytes)",
            record.job_id,
            record.execution_log.len()
        );
        Ok(())
    }

    /// Read the job slot into `record`
    ///
    /// Returns `Ok(false)` and resets `record` when no job is stored.
    /// Missing counters read as 0, a missing start time as "now", missing
    /// blobs as empty. Blobs longer than their buffer are truncated, and a
    /// corrupted blob reads as empty.
    pub async fn load(&mut self, record: &mut JobProgressRecord) -> Result<bool, JobStoreError> {
        let job_id = self.read_u32(StorageKey::JobId).await?.unwrap_or(0);

        if job_id == 0 {
            record.reset();
            info!("No job in flash");
            return Ok(false);
        }

        record.job_id = job_id;
        record.total_items = self.read_u32(StorageKey::TotalItems).await?.unwrap_or(0);
        record.completed_items = self
            .read_u32(StorageKey::CompletedItems)
            .await?
            .unwrap_or(0);
        record.failed_items = self.read_u32(StorageKey::FailedItems).await?.unwrap_or(0);
        record.started_at_ms = match self.read_u32(StorageKey::StartedAt).await? {
            Some(ts) => ts,
            None => self.clock.now_ms(),
        };

        self.read_text(StorageKey::Payload, &mut record.payload)
            .await?;
        self.read_text(StorageKey::ExecutionLog, &mut record.execution_log)
            .await?;

        info!(
            "Job {} loaded from flash (done: {}, failed: {})",
            record.job_id,
            record.completed_items,
            record.failed_items
        );
        Ok(true)
    }

    /// Erase the job slot
    pub async fn clear(&mut self) -> Result<(), JobStoreError> {
        self.storage.erase_all().await?;
        info!("Job cleared from flash");
        Ok(())
    }

    /// Check if a job is waiting in the slot
    ///
    /// Reads only the job id. A storage failure reads as "no job".
    pub async fn has_pending(&mut self) -> bool {
        match self.read_u32(StorageKey::JobId).await {
            Ok(id) => id.unwrap_or(0) > 0,
            Err(e) => {
                warn!("Job slot unreadable: {:?}", e);
                false
            }
        }
    }

    /// Boot-time recovery
    ///
    /// Loads the pending job into `record` if there is one. Returns `true`
    /// when execution should resume.
    pub async fn recover(&mut self, record: &mut JobProgressRecord) -> bool {
        if !self.has_pending().await {
            record.reset();
            return false;
        }

        match self.load(record).await {
            Ok(found) => {
                if found {
                    info!(
                        "Resuming job {}: {} of {} items remaining",
                        record.job_id,
                        record.remaining_items(),
                        record.total_items
                    );
                }
                found
            }
            Err(e) => {
                warn!("Failed to recover job: {:?}", e);
                record.reset();
                false
            }
        }
    }

    /// Verify the slot holds `job_id` before a partial update
    async fn check_slot(&mut self, job_id: u32) -> Result<(), JobStoreError> {
        if job_id == 0 {
            return Err(JobStoreError::InvalidJobId);
        }

        match self.read_u32(StorageKey::JobId).await? {
            None | Some(0) => Err(JobStoreError::NoJob),
            Some(stored) if stored != job_id => Err(JobStoreError::JobMismatch {
                stored,
                requested: job_id,
            }),
            Some(_) => Ok(()),
        }
    }

    async fn write_u32(&mut self, key: StorageKey, value: u32) -> Result<(), StorageError> {
        self.storage.write(key, &value.to_le_bytes()).await
    }

    /// Read a u32 entry; `None` if it was never written
    async fn read_u32(&mut self, key: StorageKey) -> Result<Option<u32>, StorageError> {
        let mut buf = [0u8; 4];
        match self.storage.read(key, &mut buf).await {
            Ok(4) => Ok(Some(u32::from_le_bytes(buf))),
            Ok(_) | Err(StorageError::BufferTooSmall) => Err(StorageError::Corrupted),
            Err(StorageError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read a blob entry into `text`, truncating to its capacity
    async fn read_text<const N: usize>(
        &mut self,
        key: StorageKey,
        text: &mut BoundedText<N>,
    ) -> Result<(), StorageError> {
        let mut buf = [0u8; MAX_VALUE_LEN];
        match self.storage.read(key, &mut buf).await {
            Ok(len) => {
                if text.set_truncating(&buf[..len]) {
                    warn!(
                        "{:?} truncated from {} to {} bytes",
                        key,
                        len,
                        text.capacity()
                    );
                }
                Ok(())
            }
            Err(StorageError::NotFound) => {
                text.clear();
                Ok(())
            }
            Err(StorageError::BufferTooSmall) => {
                warn!("{:?} larger than {} bytes, dropped", key, MAX_VALUE_LEN);
                text.clear();
                Ok(())
            }
            Err(StorageError::Corrupted) => {
                warn!("{:?} corrupted, dropped", key);
                text.clear();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dosify_hal::storage::MemoryStore;
    use embassy_futures::block_on;

    struct FixedClock(u32);

    impl Clock for FixedClock {
        fn now_ms(&self) -> u32 {
            self.0
        }
    }

    fn store() -> JobStore<MemoryStore, FixedClock> {
        JobStore::new(MemoryStore::new(), FixedClock(5_000))
    }

    fn sample_record() -> JobProgressRecord {
        let mut record = JobProgressRecord::new(7, 10, 1_234);
        record.completed_items = 3;
        record.failed_items = 1;
        record
            .payload
            .set(br#"{"id":7,"items":[{"slot":1,"grams":5}]}"#)
            .unwrap();
        record.execution_log.set(br#"[{"item":0,"ok":true}]"#).unwrap();
        record
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut store = store();
        let record = sample_record();

        block_on(store.save(&record)).unwrap();

        let mut loaded = JobProgressRecord::default();
        assert_eq!(block_on(store.load(&mut loaded)), Ok(true));
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_recover_after_power_cycle() {
        let mut store = store();
        block_on(store.save(&sample_record())).unwrap();

        // Drop the store, keep the flash contents, boot again
        let flash = store.into_storage();
        let mut store = JobStore::new(flash, FixedClock(0));

        let mut loaded = JobProgressRecord::default();
        assert!(block_on(store.recover(&mut loaded)));
        assert_eq!(loaded.job_id, 7);
        assert_eq!(loaded.completed_items, 3);
        assert_eq!(loaded.failed_items, 1);
        assert_eq!(loaded.remaining_items(), 6);
    }

    #[test]
    fn test_save_rejects_job_id_zero() {
        let mut store = store();
        let record = JobProgressRecord::new(0, 5, 0);

        assert_eq!(
            block_on(store.save(&record)),
            Err(JobStoreError::InvalidJobId)
        );
        assert!(store.storage().is_empty());
    }

    #[test]
    fn test_interrupted_first_save_leaves_no_job() {
        let mut storage = MemoryStore::new();
        storage.fail_next_write(StorageError::Flash);
        let mut store = JobStore::new(storage, FixedClock(0));

        assert_eq!(
            block_on(store.save(&sample_record())),
            Err(JobStoreError::Storage(StorageError::Flash))
        );
        assert!(!block_on(store.has_pending()));
        assert_eq!(store.storage().write_count(StorageKey::JobId), 0);
    }

    #[test]
    fn test_save_writes_job_id_after_fields() {
        let mut store = store();
        block_on(store.save(&sample_record())).unwrap();

        // Every field is present once the id is visible
        let storage = store.storage();
        assert_eq!(storage.len(), 7);
        assert_eq!(storage.raw(StorageKey::JobId), Some(&7u32.to_le_bytes()[..]));
        assert_eq!(
            storage.raw(StorageKey::StartedAt),
            Some(&1_234u32.to_le_bytes()[..])
        );
    }

    #[test]
    fn test_load_empty_store_resets_record() {
        let mut store = store();
        let mut record = sample_record();

        assert_eq!(block_on(store.load(&mut record)), Ok(false));
        assert_eq!(record, JobProgressRecord::default());
    }

    #[test]
    fn test_load_treats_stored_zero_as_absent() {
        let mut storage = MemoryStore::new();
        block_on(storage.write(StorageKey::JobId, &0u32.to_le_bytes())).unwrap();
        block_on(storage.write(StorageKey::TotalItems, &9u32.to_le_bytes())).unwrap();
        let mut store = JobStore::new(storage, FixedClock(0));

        let mut record = JobProgressRecord::default();
        assert_eq!(block_on(store.load(&mut record)), Ok(false));
        assert!(!block_on(store.has_pending()));
    }

    #[test]
    fn test_load_defaults_missing_fields() {
        let mut storage = MemoryStore::new();
        block_on(storage.write(StorageKey::JobId, &12u32.to_le_bytes())).unwrap();
        let mut store = JobStore::new(storage, FixedClock(77_000));

        let mut record = sample_record();
        assert_eq!(block_on(store.load(&mut record)), Ok(true));

        assert_eq!(record.job_id, 12);
        assert_eq!(record.total_items, 0);
        assert_eq!(record.completed_items, 0);
        assert_eq!(record.failed_items, 0);
        // Missing start time reads as the current time
        assert_eq!(record.started_at_ms, 77_000);
        assert!(record.payload.is_empty());
        assert!(record.execution_log.is_empty());
    }

    #[test]
    fn test_load_truncates_oversized_payload() {
        let mut storage = MemoryStore::new();
        let payload = [b'p'; MAX_VALUE_LEN];
        block_on(storage.write(StorageKey::JobId, &3u32.to_le_bytes())).unwrap();
        block_on(storage.write(StorageKey::Payload, &payload)).unwrap();
        let mut store = JobStore::new(storage, FixedClock(0));

        let mut record = JobProgressRecord::default();
        assert_eq!(block_on(store.load(&mut record)), Ok(true));

        assert_eq!(record.payload.len(), 4095);
        assert_eq!(record.payload.as_bytes(), &payload[..4095]);
    }

    #[test]
    fn test_load_truncates_oversized_log() {
        let mut storage = MemoryStore::new();
        let mut log = [b'l'; 3000];
        log[2046] = b'!';
        log[2047] = b'?';
        block_on(storage.write(StorageKey::JobId, &3u32.to_le_bytes())).unwrap();
        block_on(storage.write(StorageKey::ExecutionLog, &log)).unwrap();
        let mut store = JobStore::new(storage, FixedClock(0));

        let mut record = JobProgressRecord::default();
        block_on(store.load(&mut record)).unwrap();

        assert_eq!(record.execution_log.len(), 2047);
        assert_eq!(record.execution_log.as_bytes().last(), Some(&b'!'));
    }

    #[test]
    fn test_load_rejects_malformed_counter() {
        let mut storage = MemoryStore::new();
        block_on(storage.write(StorageKey::JobId, &3u32.to_le_bytes())).unwrap();
        block_on(storage.write(StorageKey::CompletedItems, &[1, 2])).unwrap();
        let mut store = JobStore::new(storage, FixedClock(0));

        let mut record = JobProgressRecord::default();
        assert_eq!(
            block_on(store.load(&mut record)),
            Err(JobStoreError::Storage(StorageError::Corrupted))
        );
    }

    #[test]
    fn test_load_does_not_validate_cross_field_consistency() {
        let mut store = store();
        let mut record = sample_record();
        record.completed_items = 50;
        block_on(store.save(&record)).unwrap();

        let mut loaded = JobProgressRecord::default();
        assert_eq!(block_on(store.load(&mut loaded)), Ok(true));
        assert_eq!(loaded.completed_items, 50);
        assert!(loaded.is_finished());
    }

    #[test]
    fn test_has_pending_lifecycle() {
        let mut store = store();
        assert!(!block_on(store.has_pending()));

        block_on(store.save(&sample_record())).unwrap();
        assert!(block_on(store.has_pending()));

        block_on(store.clear()).unwrap();
        assert!(!block_on(store.has_pending()));
        assert!(store.storage().is_empty());
    }

    #[test]
    fn test_save_progress_skips_payload() {
        let mut store = store();
        let mut record = sample_record();
        block_on(store.save(&record)).unwrap();

        record.record_completed();
        record.record_failed();
        block_on(store.save_progress(&record)).unwrap();

        let storage = store.storage();
        assert_eq!(storage.write_count(StorageKey::Payload), 1);
        assert_eq!(storage.write_count(StorageKey::ExecutionLog), 1);
        assert_eq!(storage.write_count(StorageKey::JobId), 1);
        assert_eq!(storage.write_count(StorageKey::CompletedItems), 2);

        let mut loaded = JobProgressRecord::default();
        block_on(store.load(&mut loaded)).unwrap();
        assert_eq!(loaded.completed_items, 4);
        assert_eq!(loaded.failed_items, 2);
        assert_eq!(loaded.payload, record.payload);
    }

    #[test]
    fn test_save_progress_requires_saved_job() {
        let mut store = store();
        let record = sample_record();

        assert_eq!(
            block_on(store.save_progress(&record)),
            Err(JobStoreError::NoJob)
        );
        assert!(store.storage().is_empty());
    }

    #[test]
    fn test_save_progress_rejects_other_job() {
        let mut store = store();
        block_on(store.save(&sample_record())).unwrap();

        let other = JobProgressRecord::new(8, 2, 0);
        assert_eq!(
            block_on(store.save_progress(&other)),
            Err(JobStoreError::JobMismatch {
                stored: 7,
                requested: 8
            })
        );
        assert_eq!(
            block_on(store.save_progress(&JobProgressRecord::default())),
            Err(JobStoreError::InvalidJobId)
        );
    }

    #[test]
    fn test_save_log_updates_only_log() {
        let mut store = store();
        let mut record = sample_record();
        block_on(store.save(&record)).unwrap();

        record.execution_log.append_truncating(br#",{"item":1,"ok":false}"#);
        block_on(store.save_log(&record)).unwrap();

        assert_eq!(store.storage().write_count(StorageKey::ExecutionLog), 2);
        assert_eq!(store.storage().write_count(StorageKey::CompletedItems), 1);

        let mut loaded = JobProgressRecord::default();
        block_on(store.load(&mut loaded)).unwrap();
        assert_eq!(loaded.execution_log, record.execution_log);
    }

    #[test]
    fn test_recover_empty_store() {
        let mut store = store();
        let mut record = sample_record();

        assert!(!block_on(store.recover(&mut record)));
        assert!(!record.is_present());
    }

    #[test]
    fn test_corrupted_log_keeps_job() {
        let mut store = store();
        block_on(store.save(&sample_record())).unwrap();

        // Torn log rewrite before the power cut
        let mut storage = store.into_storage();
        storage.fail_next_read(StorageKey::ExecutionLog, StorageError::Corrupted);
        let mut store = JobStore::new(storage, FixedClock(0));

        let mut record = JobProgressRecord::default();
        assert!(block_on(store.recover(&mut record)));
        assert_eq!(record.job_id, 7);
        assert_eq!(record.completed_items, 3);
        assert_eq!(record.failed_items, 1);
        assert_eq!(record.payload.as_bytes(), sample_record().payload.as_bytes());
        assert!(record.execution_log.is_empty());
    }

    #[test]
    fn test_corrupted_payload_reads_as_empty() {
        let mut store = store();
        block_on(store.save(&sample_record())).unwrap();

        let mut storage = store.into_storage();
        storage.fail_next_read(StorageKey::Payload, StorageError::Corrupted);
        let mut store = JobStore::new(storage, FixedClock(0));

        let mut record = JobProgressRecord::default();
        assert_eq!(block_on(store.load(&mut record)), Ok(true));
        assert!(record.payload.is_empty());
        assert_eq!(record.total_items, 10);
    }

    #[test]
    fn test_failed_recover_leaves_default_record() {
        let mut store = store();
        block_on(store.save(&sample_record())).unwrap();

        let mut storage = store.into_storage();
        storage.fail_next_read(StorageKey::CompletedItems, StorageError::Flash);
        let mut store = JobStore::new(storage, FixedClock(0));

        let mut record = sample_record();
        assert!(!block_on(store.recover(&mut record)));
        assert_eq!(record, JobProgressRecord::default());
        assert!(!record.is_present());
    }
}
