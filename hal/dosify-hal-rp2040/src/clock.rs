//! Monotonic millisecond clock

use dosify_core::traits::Clock;
use embassy_time::Instant;

/// Milliseconds since boot from the embassy time driver
///
/// Truncated to u32, so it wraps after about 49.7 days. Consumers compare
/// timestamps with wrapping arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
