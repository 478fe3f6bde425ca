//! Per-tag read aggregation.
//!
//! A [`TagAggregate`] tracks everything the session knows about one EPC:
//! its rolling read history, read timestamps and visibility state. It is
//! owned by exactly one session and is never shared.
//!
//! # State Transitions
//!
//! ```text
//! (new) --record_read--> Found --record_read--> Updated --record_read--> Updated
//!                          │                       │
//!                          └──── mark_lost ────────┴──> Lost --record_read--> Found
//! ```

use crate::history::ReadHistory;
use grokker_core::{Epc, Rssi, TagRead, TagReadState, Timestamp};

/// Rolling read statistics and visibility state for one EPC.
#[derive(Debug, Clone, PartialEq)]
pub struct TagAggregate {
    epc: Epc,
    history: ReadHistory,
    state: Option<TagReadState>,

    /// Start of the current visibility period. Used to clamp the find-rate
    /// window for newly found tags.
    created_at: Timestamp,
    first_read: Option<Timestamp>,
    last_read: Option<Timestamp>,
    total_reads: u64,
    rssi: Option<Rssi>,
}

impl TagAggregate {
    /// Create an aggregate with no reads.
    pub fn new(epc: Epc, history_interval_ms: u64, history_depth: usize) -> Self {
        Self {
            epc,
            history: ReadHistory::new(history_interval_ms, history_depth),
            state: None,
            created_at: 0,
            first_read: None,
            last_read: None,
            total_reads: 0,
            rssi: None,
        }
    }

    /// The tag identifier.
    pub fn epc(&self) -> &Epc {
        &self.epc
    }

    /// Current state, `None` before the first read.
    pub fn current_state(&self) -> Option<TagReadState> {
        self.state
    }

    /// Returns `true` if the tag is `Found` or `Updated`.
    pub fn is_visible(&self) -> bool {
        self.state.is_some_and(TagReadState::is_visible)
    }

    /// Timestamp of the first read ever recorded.
    pub fn first_read(&self) -> Option<Timestamp> {
        self.first_read
    }

    /// Timestamp of the most recent read.
    pub fn last_read(&self) -> Option<Timestamp> {
        self.last_read
    }

    /// Total reads recorded over the aggregate's lifetime.
    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    /// Signal strength of the most recent read that reported one.
    pub fn rssi(&self) -> Option<Rssi> {
        self.rssi
    }

    /// Length of the forget window in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.history.window_ms()
    }

    /// Record a read and return the resulting state.
    ///
    /// Returns `Found` on the first read and on the first read after the tag
    /// was marked `Lost` (which also restarts the history); `Updated`
    /// otherwise.
    pub fn record_read(&mut self, at: Timestamp) -> TagReadState {
        let state = match self.state {
            None | Some(TagReadState::Lost) => {
                self.history.clear();
                self.created_at = at;
                self.first_read.get_or_insert(at);
                TagReadState::Found
            }
            Some(_) => TagReadState::Updated,
        };

        self.history.record(at);
        self.last_read = Some(self.last_read.map_or(at, |last| last.max(at)));
        self.total_reads = self.total_reads.saturating_add(1);
        self.state = Some(state);
        state
    }

    /// Record a raw read, keeping its RSSI if present.
    pub fn record(&mut self, read: &TagRead) -> TagReadState {
        if read.rssi.is_some() {
            self.rssi = read.rssi;
        }
        self.record_read(read.timestamp)
    }

    /// Reads per second over the last `min(window, elapsed since found)`.
    ///
    /// Returns 0 before any read and when no time has elapsed.
    pub fn find_rate(&self, at: Timestamp) -> f64 {
        if self.state.is_none() {
            return 0.0;
        }
        let elapsed = at.saturating_sub(self.created_at);
        let window = self.window_ms().min(elapsed);
        if window == 0 {
            return 0.0;
        }
        let count = self.history.sum_over(window, at);
        count as f64 * 1000.0 / window as f64
    }

    /// Returns `true` if no read landed within the forget window before `at`.
    ///
    /// An aggregate without reads is never stale.
    pub fn is_stale(&self, at: Timestamp) -> bool {
        self.last_read
            .is_some_and(|last| at.saturating_sub(last) >= self.window_ms())
    }

    /// Zero history slots that expired by `at` without recording a read.
    pub fn advance(&mut self, at: Timestamp) {
        self.history.advance(at);
    }

    /// Transition a visible tag to `Lost`.
    ///
    /// Returns `true` if the state changed; a tag is reported lost once.
    pub fn mark_lost(&mut self) -> bool {
        if self.is_visible() {
            self.state = Some(TagReadState::Lost);
            true
        } else {
            false
        }
    }

    /// Read counts per interval, oldest first.
    pub fn history(&self) -> Vec<u32> {
        self.history.to_vec()
    }

    /// Compact history rendering: `.` for zero, the digit for 1-9 and `*`
    /// for ten or more reads in an interval.
    pub fn history_string(&self) -> String {
        self.history
            .to_vec()
            .into_iter()
            .map(|count| match count {
                0 => '.',
                1..=9 => char::from(b'0' + count as u8),
                _ => '*',
            })
            .collect()
    }
}
