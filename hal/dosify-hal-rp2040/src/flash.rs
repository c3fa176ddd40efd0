//! Flash key/value store for RP2040
//!
//! Uses sequential-storage for wear-leveled key-value storage in the last
//! 64KB of flash. That partition is the job slot's namespace and holds
//! nothing else.
//!
//! A sequential-storage item has to fit in one erase page, and the job
//! payload alone can fill a page. Values are therefore split into chunks,
//! each stored under a [`ChunkKey`]. Chunk 0 is the header: the value
//! length as a little-endian u16, the tail generation, then the first
//! bytes of the value. Chunks 1.. carry the rest under that generation.
//!
//! A rewrite stores its tail chunks under the other generation and writes
//! the header last. Until the header lands, the old header still points at
//! the old, untouched tail, so a value only changes once its header lands.
//! Stale tail chunks from a longer previous value are ignored because the
//! header length bounds every read.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{self, Key, SerializationError};

use dosify_hal::storage::{KeyValueStore, StorageError, StorageKey, MAX_VALUE_LEN};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on the Pico
pub const JOB_PARTITION_SIZE: usize = 64 * 1024; // 64KB for the job slot
pub const JOB_PARTITION_START: usize = FLASH_SIZE - JOB_PARTITION_SIZE;

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Flash range for the job partition
pub const JOB_RANGE: core::ops::Range<u32> = (JOB_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Value bytes per chunk
pub const CHUNK_LEN: usize = 1024;

/// Length prefix and generation stored at the start of chunk 0
const HEADER_LEN: usize = 3;

/// Value bytes that fit in chunk 0 after the length prefix
const FIRST_CHUNK_DATA: usize = CHUNK_LEN - HEADER_LEN;

/// Scratch buffer for one serialized item (key, value, and item header)
const ITEM_BUFFER_LEN: usize = CHUNK_LEN + 64;

/// Storage key plus tail generation and chunk index
///
/// The header chunk always uses generation 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChunkKey {
    /// Job slot field
    pub key: StorageKey,
    /// Tail generation (0 or 1)
    pub generation: u8,
    /// Chunk index within the value
    pub chunk: u8,
}

impl ChunkKey {
    fn header(key: StorageKey) -> Self {
        Self {
            key,
            generation: 0,
            chunk: 0,
        }
    }

    fn tail(key: StorageKey, generation: u8, chunk: u8) -> Self {
        Self {
            key,
            generation,
            chunk,
        }
    }
}

impl Key for ChunkKey {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        let used = self.key.serialize_into(buffer)?;
        let slot = buffer
            .get_mut(used..used + 2)
            .ok_or(SerializationError::BufferTooSmall)?;
        slot.copy_from_slice(&[self.generation, self.chunk]);
        Ok(used + 2)
    }

    fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError> {
        let (key, used) = StorageKey::deserialize_from(buffer)?;
        let suffix = buffer
            .get(used..used + 2)
            .ok_or(SerializationError::BufferTooSmall)?;
        Ok((Self::tail(key, suffix[0], suffix[1]), used + 2))
    }
}

/// Tail generation for the next write, given the current header chunk
///
/// Alternates between 0 and 1 so a rewrite never touches the tail the
/// committed header points at.
fn next_generation(header: Option<&[u8]>) -> u8 {
    match header {
        Some(chunk) if chunk.len() >= HEADER_LEN => (chunk[2] & 1) ^ 1,
        _ => 0,
    }
}

/// Number of chunks a value of `len` bytes occupies
pub fn chunk_count(len: usize) -> usize {
    if len <= FIRST_CHUNK_DATA {
        1
    } else {
        1 + (len - FIRST_CHUNK_DATA).div_ceil(CHUNK_LEN)
    }
}

/// Byte range of `data` stored in chunk `index` (for `index >= 1`)
fn tail_chunk_range(len: usize, index: usize) -> core::ops::Range<usize> {
    let start = FIRST_CHUNK_DATA + (index - 1) * CHUNK_LEN;
    start..(start + CHUNK_LEN).min(len)
}

/// RP2040 flash key/value store
///
/// Provides the job slot namespace on top of sequential-storage. Every
/// method finishes its flash traffic before returning.
pub struct Rp2040KeyValueStore<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> Rp2040KeyValueStore<'d> {
    /// Create a new flash store instance
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }

    /// Get the raw flash peripheral for low-level access
    pub fn flash(&mut self) -> &mut Flash<'d, FLASH, Async, FLASH_SIZE> {
        &mut self.flash
    }

    /// Fetch one chunk into `out`, returning its length
    async fn fetch_chunk(
        &mut self,
        key: ChunkKey,
        out: &mut [u8; CHUNK_LEN],
    ) -> Result<Option<usize>, StorageError> {
        let mut data_buffer = [0u8; ITEM_BUFFER_LEN];

        let result = map::fetch_item::<ChunkKey, &[u8], _>(
            &mut self.flash,
            JOB_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) => {
                let len = data.len();
                if len > CHUNK_LEN {
                    return Err(StorageError::Corrupted);
                }
                out[..len].copy_from_slice(data);
                Ok(Some(len))
            }
            Ok(None) => Ok(None),
            Err(_) => Err(StorageError::Storage),
        }
    }

    async fn store_chunk(&mut self, key: ChunkKey, data: &[u8]) -> Result<(), StorageError> {
        let mut data_buffer = [0u8; ITEM_BUFFER_LEN];

        map::store_item(
            &mut self.flash,
            JOB_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
            &data,
        )
        .await
        .map_err(|e| match e {
            sequential_storage::Error::FullStorage => StorageError::Full,
            sequential_storage::Error::Storage { .. } => StorageError::Flash,
            _ => StorageError::Storage,
        })
    }
}

impl KeyValueStore for Rp2040KeyValueStore<'_> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
        let mut chunk = [0u8; CHUNK_LEN];

        let len = self
            .fetch_chunk(ChunkKey::header(key), &mut chunk)
            .await?
            .ok_or(StorageError::NotFound)?;
        if len < HEADER_LEN {
            return Err(StorageError::Corrupted);
        }

        let total = u16::from_le_bytes([chunk[0], chunk[1]]) as usize;
        let generation = chunk[2];
        if total > MAX_VALUE_LEN {
            return Err(StorageError::Corrupted);
        }
        if buffer.len() < total {
            return Err(StorageError::BufferTooSmall);
        }

        let head = total.min(FIRST_CHUNK_DATA);
        if len != HEADER_LEN + head {
            return Err(StorageError::Corrupted);
        }
        buffer[..head].copy_from_slice(&chunk[HEADER_LEN..len]);

        for index in 1..chunk_count(total) {
            let range = tail_chunk_range(total, index);
            let got = self
                .fetch_chunk(ChunkKey::tail(key, generation, index as u8), &mut chunk)
                .await?
                .ok_or(StorageError::Corrupted)?;
            if got != range.len() {
                return Err(StorageError::Corrupted);
            }
            buffer[range].copy_from_slice(&chunk[..got]);
        }

        Ok(total)
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_VALUE_LEN {
            return Err(StorageError::Full);
        }

        let mut first = [0u8; CHUNK_LEN];
        let current = self.fetch_chunk(ChunkKey::header(key), &mut first).await?;
        let generation = next_generation(current.map(|len| &first[..len]));

        // Tail chunks first, under the generation the old header does not
        // use; the header commits the value
        for index in 1..chunk_count(data.len()) {
            let range = tail_chunk_range(data.len(), index);
            self.store_chunk(ChunkKey::tail(key, generation, index as u8), &data[range])
                .await?;
        }

        let head = data.len().min(FIRST_CHUNK_DATA);
        first[..2].copy_from_slice(&(data.len() as u16).to_le_bytes());
        first[2] = generation;
        first[HEADER_LEN..HEADER_LEN + head].copy_from_slice(&data[..head]);

        self.store_chunk(ChunkKey::header(key), &first[..HEADER_LEN + head])
            .await
    }

    async fn exists(&mut self, key: StorageKey) -> bool {
        let mut chunk = [0u8; CHUNK_LEN];

        matches!(
            self.fetch_chunk(ChunkKey::header(key), &mut chunk).await,
            Ok(Some(_))
        )
    }

    async fn erase_all(&mut self) -> Result<(), StorageError> {
        // Erase the job partition sector by sector
        let start = JOB_PARTITION_START as u32;
        let end = FLASH_SIZE as u32;

        self.flash
            .erase(start, end)
            .await
            .map_err(|_| StorageError::Flash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_layout() {
        assert_eq!(JOB_RANGE.end - JOB_RANGE.start, 64 * 1024);
        assert_eq!(JOB_PARTITION_START % FLASH_ERASE_SIZE, 0);
    }

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(0), 1);
        assert_eq!(chunk_count(4), 1);
        assert_eq!(chunk_count(FIRST_CHUNK_DATA), 1);
        assert_eq!(chunk_count(FIRST_CHUNK_DATA + 1), 2);
        // Full payload: 1021 in chunk 0, then 1024 + 1024 + 1024 + 3
        assert_eq!(chunk_count(MAX_VALUE_LEN), 5);
    }

    #[test]
    fn test_tail_chunks_cover_value() {
        let len = 3000;
        let mut covered = FIRST_CHUNK_DATA;
        for index in 1..chunk_count(len) {
            let range = tail_chunk_range(len, index);
            assert_eq!(range.start, covered);
            covered = range.end;
        }
        assert_eq!(covered, len);
    }

    #[test]
    fn test_chunk_key_encoding() {
        let key = ChunkKey::tail(StorageKey::Payload, 1, 3);
        let mut buf = [0u8; 4];

        assert_eq!(key.serialize_into(&mut buf), Ok(3));
        assert_eq!(&buf[..3], &[5, 1, 3]);
        assert_eq!(ChunkKey::deserialize_from(&buf[..3]), Ok((key, 3)));

        assert_eq!(
            key.serialize_into(&mut buf[..2]),
            Err(SerializationError::BufferTooSmall)
        );
    }

    #[test]
    fn test_header_and_tails_never_share_a_key() {
        let header = ChunkKey::header(StorageKey::ExecutionLog);
        for generation in 0..2 {
            let tail = ChunkKey::tail(StorageKey::ExecutionLog, generation, 1);
            assert_ne!(header, tail);
        }
    }

    #[test]
    fn test_rewrite_alternates_tail_generation() {
        // First write of a key
        assert_eq!(next_generation(None), 0);

        // 1500-byte log committed with generation 0
        let mut header = [0u8; HEADER_LEN];
        header[..2].copy_from_slice(&1500u16.to_le_bytes());
        header[2] = 0;
        let rewrite = next_generation(Some(&header));
        assert_eq!(rewrite, 1);

        // The committed tail keeps its key while the rewrite is in flight
        assert_ne!(
            ChunkKey::tail(StorageKey::ExecutionLog, header[2], 1),
            ChunkKey::tail(StorageKey::ExecutionLog, rewrite, 1)
        );

        header[2] = rewrite;
        assert_eq!(next_generation(Some(&header)), 0);
    }

    #[test]
    fn test_short_header_restarts_generation() {
        assert_eq!(next_generation(Some(&[4, 0])), 0);
    }
}
