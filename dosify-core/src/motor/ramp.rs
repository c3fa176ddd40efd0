//! Duty ramp generation
//!
//! A ramp is the sequence of duty values written between the current duty
//! and a target. Each step moves by at most `step`, the last step lands
//! exactly on the target, and the sequence never leaves the interval
//! between start and target.

/// Iterator over the duty values of a ramp
///
/// The starting duty itself is not yielded; it has already been written.
/// A ramp whose start equals its target yields nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ramp {
    current: u16,
    target: u16,
    step: u16,
}

impl Ramp {
    /// Create a ramp from `from` to `to`
    ///
    /// A `step` of 0 is treated as 1 so the ramp always terminates.
    pub fn new(from: u16, to: u16, step: u16) -> Self {
        Self {
            current: from,
            target: to,
            step: step.max(1),
        }
    }

    /// Duty value most recently yielded (or the start value)
    pub fn current(&self) -> u16 {
        self.current
    }

    /// Target duty value
    pub fn target(&self) -> u16 {
        self.target
    }

    /// Check if the ramp has reached its target
    pub fn is_done(&self) -> bool {
        self.current == self.target
    }

    /// Number of steps remaining
    pub fn steps_remaining(&self) -> u32 {
        let distance = self.current.abs_diff(self.target) as u32;
        distance.div_ceil(self.step as u32)
    }

    /// Total time to finish the ramp at `interval_ms` per step
    pub fn duration_ms(&self, interval_ms: u32) -> u32 {
        self.steps_remaining().saturating_mul(interval_ms)
    }
}

impl Iterator for Ramp {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.current < self.target {
            self.current = self.current.saturating_add(self.step).min(self.target);
        } else if self.current > self.target {
            self.current = self.current.saturating_sub(self.step).max(self.target);
        } else {
            return None;
        }
        Some(self.current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.steps_remaining() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Ramp {}
