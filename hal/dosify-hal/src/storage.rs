//! Non-volatile key/value storage abstractions
//!
//! Provides the namespaced key/value primitive the job store is built on.
//! One implementation owns one namespace (on RP2040, a dedicated flash
//! partition); every key below lives inside it.

/// Largest value a single entry may hold, in bytes
///
/// Matches the 4 KiB job payload buffer. Backends reject larger writes.
pub const MAX_VALUE_LEN: usize = 4096;

/// Storage keys for the job slot
///
/// Each field of the in-progress job is its own entry so scalar counters
/// can be rewritten without touching the large payload blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Job identifier (u32, 0 = no job)
    JobId = 0,
    /// Total item count (u32)
    TotalItems = 1,
    /// Completed item count (u32)
    CompletedItems = 2,
    /// Failed item count (u32)
    FailedItems = 3,
    /// Job start timestamp in ms (u32)
    StartedAt = 4,
    /// Job definition blob
    Payload = 5,
    /// Execution trace blob
    ExecutionLog = 6,
}

impl StorageKey {
    /// Every key in the namespace, in write order for a full save
    pub const ALL: [StorageKey; 7] = [
        StorageKey::TotalItems,
        StorageKey::CompletedItems,
        StorageKey::FailedItems,
        StorageKey::StartedAt,
        StorageKey::Payload,
        StorageKey::ExecutionLog,
        StorageKey::JobId,
    ];

    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a key from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageKey::JobId),
            1 => Some(StorageKey::TotalItems),
            2 => Some(StorageKey::CompletedItems),
            3 => Some(StorageKey::FailedItems),
            4 => Some(StorageKey::StartedAt),
            5 => Some(StorageKey::Payload),
            6 => Some(StorageKey::ExecutionLog),
            _ => None,
        }
    }
}

/// Errors from key/value storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Flash operation failed
    Flash,
    /// Storage operation failed
    Storage,
    /// Key not found
    NotFound,
    /// Buffer too small for the data
    BufferTooSmall,
    /// Data corrupted or invalid
    Corrupted,
    /// Storage is full, or the value exceeds [`MAX_VALUE_LEN`]
    Full,
}

/// Namespaced key/value store
///
/// Each call is a complete operation: implementations acquire whatever
/// handle they need and release it before returning, including on error.
/// There is no multi-key transaction.
pub trait KeyValueStore {
    /// Read a value by key into the provided buffer
    ///
    /// # Returns
    /// The number of bytes read, [`StorageError::NotFound`] if the key was
    /// never written, or [`StorageError::BufferTooSmall`] if the stored value
    /// does not fit.
    fn read(
        &mut self,
        key: StorageKey,
        buffer: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, StorageError>>;

    /// Write a value by key, replacing any previous value
    fn write(
        &mut self,
        key: StorageKey,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), StorageError>>;

    /// Check if a key exists in storage
    fn exists(&mut self, key: StorageKey) -> impl core::future::Future<Output = bool>;

    /// Erase every entry in the namespace
    fn erase_all(&mut self) -> impl core::future::Future<Output = Result<(), StorageError>>;
}

// Implement the sequential-storage Key trait when the feature is enabled
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for StorageKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[0] = self.as_u8();
        Ok(1)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        match StorageKey::from_u8(buffer[0]) {
            Some(key) => Ok((key, 1)),
            None => Err(sequential_storage::map::SerializationError::InvalidFormat),
        }
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MemoryStore;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use heapless::Vec;

    use super::{KeyValueStore, StorageError, StorageKey, MAX_VALUE_LEN};

    const KEY_COUNT: usize = StorageKey::ALL.len();

    /// RAM-backed [`KeyValueStore`]
    ///
    /// Survives being handed from one owner to the next, which is how host
    /// tests model a reboot. Counts writes per key and can inject a single
    /// failure into the next write, or into the next read of one key.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        entries: Vec<(StorageKey, Vec<u8, MAX_VALUE_LEN>), KEY_COUNT>,
        writes: [u32; KEY_COUNT],
        pending_fault: Option<StorageError>,
        read_fault: Option<(StorageKey, StorageError)>,
    }

    impl MemoryStore {
        /// Create an empty store
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of times `key` has been written since creation
        pub fn write_count(&self, key: StorageKey) -> u32 {
            self.writes[key.as_u8() as usize]
        }

        /// Number of entries currently stored
        pub fn len(&self) -> usize {
            self.entries.len()
        }

        /// Check if the namespace holds no entries
        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }

        /// Fail the next write with `error`
        pub fn fail_next_write(&mut self, error: StorageError) {
            self.pending_fault = Some(error);
        }

        /// Fail the next read of `key` with `error`
        pub fn fail_next_read(&mut self, key: StorageKey, error: StorageError) {
            self.read_fault = Some((key, error));
        }

        /// Raw stored bytes for `key`
        pub fn raw(&self, key: StorageKey) -> Option<&[u8]> {
            self.entries
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_slice())
        }
    }

    impl KeyValueStore for MemoryStore {
        async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
            if let Some((faulty, error)) = self.read_fault {
                if faulty == key {
                    self.read_fault = None;
                    return Err(error);
                }
            }

            let data = self.raw(key).ok_or(StorageError::NotFound)?;
            if buffer.len() < data.len() {
                return Err(StorageError::BufferTooSmall);
            }
            buffer[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }

        async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError> {
            if let Some(error) = self.pending_fault.take() {
                return Err(error);
            }

            let value = Vec::from_slice(data).map_err(|_| StorageError::Full)?;
            match self.entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => self
                    .entries
                    .push((key, value))
                    .map_err(|_| StorageError::Full)?,
            }

            self.writes[key.as_u8() as usize] += 1;
            Ok(())
        }

        async fn exists(&mut self, key: StorageKey) -> bool {
            self.raw(key).is_some()
        }

        async fn erase_all(&mut self) -> Result<(), StorageError> {
            self.entries.clear();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_key_byte_mapping() {
        for key in StorageKey::ALL {
            assert_eq!(StorageKey::from_u8(key.as_u8()), Some(key));
        }
        assert_eq!(StorageKey::from_u8(7), None);
    }

    #[test]
    fn test_job_id_written_last() {
        assert_eq!(StorageKey::ALL.last(), Some(&StorageKey::JobId));
    }

    #[test]
    fn test_memory_store_read_write() {
        let mut store = MemoryStore::new();
        let mut buf = [0u8; 8];

        assert_eq!(
            block_on(store.read(StorageKey::JobId, &mut buf)),
            Err(StorageError::NotFound)
        );

        block_on(store.write(StorageKey::JobId, &[7, 0, 0, 0])).unwrap();
        assert_eq!(block_on(store.read(StorageKey::JobId, &mut buf)), Ok(4));
        assert_eq!(&buf[..4], &[7, 0, 0, 0]);
        assert!(block_on(store.exists(StorageKey::JobId)));

        // Overwrite replaces rather than appends
        block_on(store.write(StorageKey::JobId, &[9, 0, 0, 0])).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.raw(StorageKey::JobId), Some(&[9u8, 0, 0, 0][..]));
        assert_eq!(store.write_count(StorageKey::JobId), 2);
    }

    #[test]
    fn test_memory_store_buffer_too_small() {
        let mut store = MemoryStore::new();
        block_on(store.write(StorageKey::Payload, b"hello world")).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(
            block_on(store.read(StorageKey::Payload, &mut buf)),
            Err(StorageError::BufferTooSmall)
        );
    }

    #[test]
    fn test_memory_store_rejects_oversized_value() {
        let mut store = MemoryStore::new();
        let big = [b'x'; MAX_VALUE_LEN + 1];
        assert_eq!(
            block_on(store.write(StorageKey::Payload, &big)),
            Err(StorageError::Full)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_erase_all() {
        let mut store = MemoryStore::new();
        block_on(store.write(StorageKey::JobId, &[1, 0, 0, 0])).unwrap();
        block_on(store.write(StorageKey::Payload, b"{}")).unwrap();

        block_on(store.erase_all()).unwrap();

        assert!(store.is_empty());
        assert!(!block_on(store.exists(StorageKey::JobId)));
    }

    #[test]
    fn test_memory_store_fault_injection_is_one_shot() {
        let mut store = MemoryStore::new();
        store.fail_next_write(StorageError::Flash);

        assert_eq!(
            block_on(store.write(StorageKey::JobId, &[1, 0, 0, 0])),
            Err(StorageError::Flash)
        );
        assert!(block_on(store.write(StorageKey::JobId, &[1, 0, 0, 0])).is_ok());
    }

    #[test]
    fn test_memory_store_read_fault_targets_one_key() {
        let mut store = MemoryStore::new();
        block_on(store.write(StorageKey::JobId, &[1, 0, 0, 0])).unwrap();
        block_on(store.write(StorageKey::ExecutionLog, b"log")).unwrap();
        store.fail_next_read(StorageKey::ExecutionLog, StorageError::Corrupted);

        let mut buf = [0u8; 8];
        assert_eq!(block_on(store.read(StorageKey::JobId, &mut buf)), Ok(4));
        assert_eq!(
            block_on(store.read(StorageKey::ExecutionLog, &mut buf)),
            Err(StorageError::Corrupted)
        );
        assert_eq!(block_on(store.read(StorageKey::ExecutionLog, &mut buf)), Ok(3));
    }
}
