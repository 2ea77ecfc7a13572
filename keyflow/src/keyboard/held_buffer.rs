use heapless::Vec;

use crate::event::{KeyPos, KeyboardEvent};

/// Max number of events kept while a tap-hold key is undecided
pub(crate) const HELD_BUFFER_SIZE: usize = 16;

/// Events held back by a pending tap-hold key, in arrival order.
#[derive(Debug, Default, Clone)]
pub(crate) struct HeldBuffer {
    pub(crate) events: Vec<KeyboardEvent, HELD_BUFFER_SIZE>,
}

impl HeldBuffer {
    pub(crate) fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Returns the event back if the buffer is full
    pub(crate) fn push(&mut self, event: KeyboardEvent) -> Result<(), KeyboardEvent> {
        self.events.push(event)
    }

    pub(crate) fn is_full(&self) -> bool {
        self.events.is_full()
    }

    /// Whether the press of `pos` is waiting in the buffer
    pub(crate) fn has_press(&self, pos: KeyPos) -> bool {
        self.events.iter().any(|e| e.pos == pos && e.pressed)
    }

    pub(crate) fn take(&mut self) -> Vec<KeyboardEvent, HELD_BUFFER_SIZE> {
        core::mem::take(&mut self.events)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
