use core::cmp::Ordering;

use embassy_time::Instant;
use heapless::binary_heap::{BinaryHeap, Min};

use crate::event::KeyPos;

/// Max number of pending deadlines
pub(crate) const DEADLINE_QUEUE_SIZE: usize = 32;

/// What a deadline was scheduled for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum DeadlineKind {
    /// Tapping term of a tap-hold key
    TapHold,
    /// Tapping term after the last tap of a tap dance
    TapDance,
    /// Tapping term after the last tap of a tap-toggle key
    TapToggle,
    /// One-shot layer timeout
    OneShot,
}

/// A timeout pseudo-event.
///
/// `id` is the id of the state it was scheduled against, the state may have
/// been resolved or replaced by the time the deadline fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct Deadline {
    pub(crate) at: Instant,
    pub(crate) pos: KeyPos,
    pub(crate) kind: DeadlineKind,
    pub(crate) id: u32,
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties are broken by the scheduling order
        self.at.cmp(&other.at).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of deadlines, earliest first
pub(crate) struct DeadlineQueue {
    heap: BinaryHeap<Deadline, Min, DEADLINE_QUEUE_SIZE>,
    next_id: u32,
}

impl DeadlineQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_id: 0,
        }
    }

    /// Allocate an id for a new state
    pub(crate) fn next_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    /// Returns false if the queue is full and the deadline is dropped
    #[must_use]
    pub(crate) fn schedule(&mut self, deadline: Deadline) -> bool {
        self.heap.push(deadline).is_ok()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.heap.len() == DEADLINE_QUEUE_SIZE
    }

    /// Earliest pending deadline
    pub(crate) fn peek(&self) -> Option<Instant> {
        self.heap.peek().map(|d| d.at)
    }

    /// Pop the earliest deadline if it is due at `now`
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<Deadline> {
        match self.heap.peek() {
            Some(d) if d.at <= now => self.heap.pop(),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}
