//! Job progress record
//!
//! The in-memory copy of the job slot. The canonical copy lives in
//! non-volatile storage and is managed by [`super::JobStore`].

use core::fmt;
use core::str::Utf8Error;

use heapless::Vec;

/// Payload buffer is 4096 bytes; one is reserved for a terminator
pub const PAYLOAD_CAPACITY: usize = 4095;

/// Execution log buffer is 2048 bytes; one is reserved for a terminator
pub const LOG_CAPACITY: usize = 2047;

/// Text blob did not fit its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError {
    /// Bytes offered
    pub len: usize,
    /// Bytes available
    pub capacity: usize,
}

/// Length-bounded byte buffer for opaque text blobs
///
/// Content is whatever the upstream producer wrote (normally JSON). The
/// strict setters reject oversized input; the `_truncating` variants cut it
/// at the capacity and report that they did.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct BoundedText<const N: usize> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> BoundedText<N> {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Create from bytes, failing if they do not fit
    pub fn from_bytes(data: &[u8]) -> Result<Self, CapacityError> {
        let mut text = Self::new();
        text.set(data)?;
        Ok(text)
    }

    /// Maximum content length in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Content length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw content
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content as UTF-8
    ///
    /// Fails if truncation split a multi-byte character.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        core::str::from_utf8(&self.bytes)
    }

    /// Clear the content
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Replace the content, failing (and leaving it unchanged) if too long
    pub fn set(&mut self, data: &[u8]) -> Result<(), CapacityError> {
        if data.len() > N {
            return Err(CapacityError {
                len: data.len(),
                capacity: N,
            });
        }
        self.bytes.clear();
        // Length checked above
        let _ = self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Replace the content, keeping at most `capacity` bytes
    ///
    /// Returns `true` if data was cut off.
    pub fn set_truncating(&mut self, data: &[u8]) -> bool {
        let keep = data.len().min(N);
        self.bytes.clear();
        let _ = self.bytes.extend_from_slice(&data[..keep]);
        keep < data.len()
    }

    /// Append to the content, keeping what fits
    ///
    /// Returns `true` if data was cut off.
    pub fn append_truncating(&mut self, data: &[u8]) -> bool {
        let room = N - self.bytes.len();
        let keep = data.len().min(room);
        let _ = self.bytes.extend_from_slice(&data[..keep]);
        keep < data.len()
    }
}

impl<const N: usize> fmt::Debug for BoundedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) if s.len() <= 32 => write!(f, "{:?}", s),
            _ => write!(f, "<{}/{} bytes>", self.len(), N),
        }
    }
}

#[cfg(feature = "defmt")]
impl<const N: usize> defmt::Format for BoundedText<N> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "<{}/{} bytes>", self.len(), N)
    }
}

/// Progress of the job currently held in the job slot
///
/// `job_id == 0` means no job. The counters are expected to satisfy
/// `completed + failed <= total`; nothing enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JobProgressRecord {
    /// Job identifier from the backend (0 = no job)
    pub job_id: u32,
    /// Items in the job
    pub total_items: u32,
    /// Items dispensed successfully
    pub completed_items: u32,
    /// Items that failed (including watchdog expiry)
    pub failed_items: u32,
    /// Monotonic ms timestamp of job acceptance (wraps)
    pub started_at_ms: u32,
    /// Job definition as received
    pub payload: BoundedText<PAYLOAD_CAPACITY>,
    /// Append-style execution trace
    pub execution_log: BoundedText<LOG_CAPACITY>,
}

impl JobProgressRecord {
    /// Create a record for a newly accepted job
    pub fn new(job_id: u32, total_items: u32, started_at_ms: u32) -> Self {
        Self {
            job_id,
            total_items,
            started_at_ms,
            ..Self::default()
        }
    }

    /// Check if this record holds a job
    pub fn is_present(&self) -> bool {
        self.job_id != 0
    }

    /// Items processed so far, successful or not
    pub fn processed_items(&self) -> u32 {
        self.completed_items.saturating_add(self.failed_items)
    }

    /// Items still to process
    pub fn remaining_items(&self) -> u32 {
        self.total_items.saturating_sub(self.processed_items())
    }

    /// Check if every item has been processed
    pub fn is_finished(&self) -> bool {
        self.remaining_items() == 0
    }

    /// Count one successfully dispensed item
    pub fn record_completed(&mut self) {
        self.completed_items = self.completed_items.saturating_add(1);
    }

    /// Count one failed item
    pub fn record_failed(&mut self) {
        self.failed_items = self.failed_items.saturating_add(1);
    }

    /// Return to the "no job" state
    pub fn reset(&mut self) {
        self.job_id = 0;
        self.total_items = 0;
        self.completed_items = 0;
        self.failed_items = 0;
        self.started_at_ms = 0;
        self.payload.clear();
        self.execution_log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_text_set_within_capacity() {
        let mut text = BoundedText::<8>::new();
        text.set(b"{\"a\":1}").unwrap();

        assert_eq!(text.as_bytes(), b"{\"a\":1}");
        assert_eq!(text.as_str(), Ok("{\"a\":1}"));
        assert_eq!(text.capacity(), 8);
    }

    #[test]
    fn test_bounded_text_set_rejects_oversize() {
        let mut text = BoundedText::<4>::from_bytes(b"keep").unwrap();

        assert_eq!(
            text.set(b"too long"),
            Err(CapacityError {
                len: 8,
                capacity: 4
            })
        );
        // Unchanged on failure
        assert_eq!(text.as_bytes(), b"keep");
    }

    #[test]
    fn test_bounded_text_truncating() {
        let mut text = BoundedText::<4>::new();

        assert!(!text.set_truncating(b"abcd"));
        assert_eq!(text.as_bytes(), b"abcd");

        assert!(text.set_truncating(b"abcdef"));
        assert_eq!(text.as_bytes(), b"abcd");
    }

    #[test]
    fn test_bounded_text_append() {
        let mut text = BoundedText::<6>::new();

        assert!(!text.append_truncating(b"abc"));
        assert!(text.append_truncating(b"defgh"));
        assert_eq!(text.as_bytes(), b"abcdef");

        // Full: nothing more fits
        assert!(text.append_truncating(b"x"));
        assert_eq!(text.len(), 6);
        assert!(!text.append_truncating(b""));
    }

    #[test]
    fn test_truncation_can_split_utf8() {
        let mut text = BoundedText::<2>::new();

        // "é" is two bytes and survives intact
        assert!(text.set_truncating("é!".as_bytes()));
        assert_eq!(text.as_str(), Ok("é"));

        // Cut lands inside "é"
        assert!(text.set_truncating("aé".as_bytes()));
        assert_eq!(text.len(), 2);
        assert!(text.as_str().is_err());
    }

    #[test]
    fn test_record_defaults_to_absent() {
        let record = JobProgressRecord::default();
        assert!(!record.is_present());
        assert!(record.payload.is_empty());
        assert_eq!(record.payload.capacity(), 4095);
        assert_eq!(record.execution_log.capacity(), 2047);
    }

    #[test]
    fn test_record_progress_counters() {
        let mut record = JobProgressRecord::new(7, 10, 1234);
        assert!(record.is_present());
        assert_eq!(record.remaining_items(), 10);

        record.record_completed();
        record.record_completed();
        record.record_failed();

        assert_eq!(record.processed_items(), 3);
        assert_eq!(record.remaining_items(), 7);
        assert!(!record.is_finished());
    }

    #[test]
    fn test_record_inconsistent_counters_saturate() {
        let mut record = JobProgressRecord::new(1, 2, 0);
        record.completed_items = 5;
        record.failed_items = u32::MAX;

        assert_eq!(record.processed_items(), u32::MAX);
        assert_eq!(record.remaining_items(), 0);
        assert!(record.is_finished());
    }

    #[test]
    fn test_record_reset() {
        let mut record = JobProgressRecord::new(3, 4, 99);
        record.payload.set(b"{}").unwrap();
        record.execution_log.set(b"[]").unwrap();

        record.reset();

        assert_eq!(record, JobProgressRecord::default());
    }
}
