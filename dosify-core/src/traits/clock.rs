//! Monotonic clock trait

/// Monotonic millisecond clock
///
/// The value wraps at `u32::MAX` (about 49.7 days). Consumers compute
/// elapsed time with `wrapping_sub`.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
