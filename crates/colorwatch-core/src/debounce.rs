//! Run-length debouncing of per-tick detection results.

use crate::params::Threshold;

/// Result of feeding one detection into a [`DetectionDebouncer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    pub result: bool,
    /// Length of the current run of identical results, always >= 1.
    pub count: u32,
}

impl Observation {
    /// True exactly on the tick where the run length equals `threshold`.
    /// Longer runs return false so a confirmed state is applied once.
    #[inline]
    pub fn reaches(&self, threshold: Threshold) -> bool {
        self.count == threshold.get()
    }
}

/// Tracks how many consecutive ticks produced the same result.
///
/// Before the first observation (and after [`reset`](Self::reset)) there is
/// no previous result at all, which is distinct from a previous `false`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetectionDebouncer {
    last: Option<bool>,
    count: u32,
}

impl DetectionDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, result: bool) -> Observation {
        if self.last == Some(result) {
            self.count = self.count.saturating_add(1);
        } else {
            self.last = Some(result);
            self.count = 1;
        }
        Observation {
            result,
            count: self.count,
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.count = 0;
    }

    pub fn last_result(&self) -> Option<bool> {
        self.last
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}
