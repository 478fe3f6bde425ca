//! Fixed-depth ring of per-interval read counts.
//!
//! Time is split into intervals of `interval_ms`. Interval `n` covers
//! `[n * interval_ms, (n + 1) * interval_ms)` and lives in slot
//! `n % depth`. The ring remembers the newest interval it has seen; moving
//! to a later interval zeroes every slot skipped on the way, so a slot never
//! carries counts from a previous cycle.

use grokker_core::Timestamp;

/// Rolling read-count history for one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadHistory {
    counts: Vec<u32>,
    interval_ms: u64,
    /// Absolute index of the newest interval, `None` until first use.
    newest: Option<u64>,
}

impl ReadHistory {
    /// Create an empty history.
    ///
    /// `interval_ms` and `depth` are expected to be non-zero; the session
    /// configuration is validated before any history is built.
    pub fn new(interval_ms: u64, depth: usize) -> Self {
        Self {
            counts: vec![0; depth.max(1)],
            interval_ms: interval_ms.max(1),
            newest: None,
        }
    }

    /// Number of slots.
    #[inline]
    pub fn depth(&self) -> usize {
        self.counts.len()
    }

    /// Width of one slot in milliseconds.
    #[inline]
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Length of the whole window in milliseconds.
    #[inline]
    pub fn window_ms(&self) -> u64 {
        self.interval_ms.saturating_mul(self.depth() as u64)
    }

    #[inline]
    fn interval_of(&self, at: Timestamp) -> u64 {
        at / self.interval_ms
    }

    #[inline]
    fn slot_of(&self, interval: u64) -> usize {
        (interval % self.depth() as u64) as usize
    }

    /// Move the newest interval forward to the one containing `at`,
    /// zeroing every slot passed over.
    ///
    /// An `at` earlier than the newest interval leaves the ring untouched.
    pub fn advance(&mut self, at: Timestamp) {
        let target = self.interval_of(at);
        let Some(newest) = self.newest else {
            self.newest = Some(target);
            return;
        };
        if target <= newest {
            return;
        }

        let gap = target - newest;
        if gap >= self.depth() as u64 {
            self.counts.fill(0);
        } else {
            for interval in newest + 1..=target {
                let slot = self.slot_of(interval);
                self.counts[slot] = 0;
            }
        }
        self.newest = Some(target);
    }

    /// Count one read at `at`.
    ///
    /// A read older than the newest interval is counted in the newest slot.
    pub fn record(&mut self, at: Timestamp) {
        self.advance(at);
        if let Some(newest) = self.newest {
            let slot = self.slot_of(newest);
            self.counts[slot] = self.counts[slot].saturating_add(1);
        }
    }

    /// Sum of counts over the last `window_ms` ending at `at`.
    ///
    /// The window is rounded up to whole intervals and capped at the ring
    /// depth. Slots already expired relative to `at` are not counted even if
    /// the ring has not been advanced yet.
    pub fn sum_over(&self, window_ms: u64, at: Timestamp) -> u64 {
        let Some(newest) = self.newest else {
            return 0;
        };
        if window_ms == 0 {
            return 0;
        }

        let slots = window_ms
            .div_ceil(self.interval_ms)
            .min(self.depth() as u64);
        let now = self.interval_of(at).max(newest);
        // `slots` and the depth are both at least one.
        let oldest_in_window = now.saturating_sub(slots - 1);
        let oldest_stored = newest.saturating_sub(self.depth() as u64 - 1);
        let from = oldest_in_window.max(oldest_stored);
        if from > newest {
            return 0;
        }

        (from..=newest)
            .map(|interval| u64::from(self.counts[self.slot_of(interval)]))
            .sum()
    }

    /// Sum of all retained counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// Counts ordered oldest to newest.
    pub fn to_vec(&self) -> Vec<u32> {
        let depth = self.depth();
        match self.newest {
            None => vec![0; depth],
            Some(newest) => {
                let start = (self.slot_of(newest) + 1) % depth;
                (0..depth)
                    .map(|i| self.counts[(start + i) % depth])
                    .collect()
            }
        }
    }

    /// Forget everything, as if newly created.
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.newest = None;
    }
}
