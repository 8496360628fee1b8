//! Read-state tracking for chatsync.
//!
//! This module decides when the mark-read signal must be sent:
//! - Once per fetch that returned at least one message
//! - Only after that page has been merged into the timeline
//! - Never for a send (sending does not imply reading the other side)
//!
//! Every fetch opens a [`FetchCycle`]. Completing a cycle yields at most one
//! [`MarkRead`]; completing it again, or completing a cycle that was
//! abandoned, yields nothing.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// Handle for one fetch, issued before the request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchCycle(u64);

impl FetchCycle {
    /// Numeric value of this cycle.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Instruction to send the mark-read signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkRead {
    /// The fetch this signal belongs to.
    pub cycle: FetchCycle,
    /// Newest message timestamp covered by the signal.
    pub up_to: Option<DateTime<Utc>>,
}

/// Tracks fetch cycles and the read cursor for one conversation.
#[derive(Debug, Clone, Default)]
pub struct ReadTracker {
    /// Next cycle number to hand out.
    next_cycle: u64,
    /// Cycles begun but not yet completed or abandoned.
    open: BTreeSet<u64>,
    /// Newest timestamp already signaled as read.
    cursor: Option<DateTime<Utc>>,
    /// Signals handed out.
    fired: u64,
    /// Signals reported as delivered.
    delivered: u64,
    /// Signals reported as failed.
    failed: u64,
}

impl ReadTracker {
    /// Create a tracker with no cycles and no read cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a cycle for a fetch about to be sent.
    pub fn begin_cycle(&mut self) -> FetchCycle {
        self.next_cycle += 1;
        self.open.insert(self.next_cycle);
        FetchCycle(self.next_cycle)
    }

    /// Report that the fetch for `cycle` succeeded and its page was merged.
    ///
    /// Returns the mark-read instruction if the page was non-empty and this
    /// cycle has not fired before.
    pub fn page_ingested(
        &mut self,
        cycle: FetchCycle,
        page_len: usize,
        newest: Option<DateTime<Utc>>,
    ) -> Option<MarkRead> {
        if !self.open.remove(&cycle.0) {
            return None;
        }
        if page_len == 0 {
            return None;
        }

        // Cursor only moves forward
        if newest > self.cursor {
            self.cursor = newest;
        }
        self.fired += 1;
        Some(MarkRead {
            cycle,
            up_to: self.cursor,
        })
    }

    /// Close a cycle whose fetch failed or whose result was discarded.
    pub fn abandon(&mut self, cycle: FetchCycle) {
        self.open.remove(&cycle.0);
    }

    /// Record whether a fired signal reached the backend.
    ///
    /// Failed signals are not retried; this only feeds diagnostics.
    pub fn record_outcome(&mut self, delivered: bool) {
        if delivered {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Newest timestamp signaled as read.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// Number of mark-read signals handed out.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Number of signals the backend acknowledged.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Number of signals that failed to reach the backend.
    pub fn failures(&self) -> u64 {
        self.failed
    }

    /// Check if any fetch is still awaiting its result.
    pub fn has_open_cycles(&self) -> bool {
        !self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn tracker_starts_empty() {
        let tracker = ReadTracker::new();
        assert!(tracker.cursor().is_none());
        assert_eq!(tracker.fired(), 0);
        assert!(!tracker.has_open_cycles());
    }

    #[test]
    fn non_empty_page_fires_once() {
        let mut tracker = ReadTracker::new();
        let cycle = tracker.begin_cycle();

        let first = tracker.page_ingested(cycle, 2, Some(at(5)));
        let second = tracker.page_ingested(cycle, 2, Some(at(5)));

        assert_eq!(
            first,
            Some(MarkRead {
                cycle,
                up_to: Some(at(5))
            })
        );
        assert!(second.is_none(), "a cycle must fire at most once");
        assert_eq!(tracker.fired(), 1);
    }

    #[test]
    fn empty_page_does_not_fire() {
        let mut tracker = ReadTracker::new();
        let cycle = tracker.begin_cycle();

        assert!(tracker.page_ingested(cycle, 0, None).is_none());
        assert_eq!(tracker.fired(), 0);
        assert!(!tracker.has_open_cycles());
    }

    #[test]
    fn each_cycle_fires_independently() {
        let mut tracker = ReadTracker::new();
        let a = tracker.begin_cycle();
        let b = tracker.begin_cycle();

        assert!(tracker.page_ingested(b, 1, Some(at(2))).is_some());
        assert!(tracker.page_ingested(a, 1, Some(at(1))).is_some());
        assert_eq!(tracker.fired(), 2);
    }

    #[test]
    fn abandoned_cycle_never_fires() {
        let mut tracker = ReadTracker::new();
        let cycle = tracker.begin_cycle();

        tracker.abandon(cycle);

        assert!(tracker.page_ingested(cycle, 3, Some(at(3))).is_none());
    }

    #[test]
    fn unknown_cycle_is_ignored() {
        let mut tracker = ReadTracker::new();
        let cycle = tracker.begin_cycle();

        assert!(tracker.page_ingested(FetchCycle(99), 1, None).is_none());
        assert!(tracker.has_open_cycles());
        assert!(tracker.page_ingested(cycle, 1, None).is_some());
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let mut tracker = ReadTracker::new();

        let newer = tracker.begin_cycle();
        tracker.page_ingested(newer, 1, Some(at(10)));
        let older = tracker.begin_cycle();
        let signal = tracker.page_ingested(older, 1, Some(at(3))).unwrap();

        assert_eq!(tracker.cursor(), Some(at(10)));
        assert_eq!(signal.up_to, Some(at(10)));
    }

    #[test]
    fn outcomes_are_counted() {
        let mut tracker = ReadTracker::new();

        tracker.record_outcome(true);
        tracker.record_outcome(false);
        tracker.record_outcome(false);

        assert_eq!(tracker.delivered(), 1);
        assert_eq!(tracker.failures(), 2);
    }

    #[test]
    fn cycles_are_increasing() {
        let mut tracker = ReadTracker::new();
        let a = tracker.begin_cycle();
        let b = tracker.begin_cycle();
        assert!(b > a);
        assert_eq!(a.value() + 1, b.value());
    }
}
