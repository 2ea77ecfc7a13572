use crate::deadline::{Deadline, DeadlineKind};
use crate::event::KeyboardEvent;
use crate::keyboard::Keyboard;

/// State machine for one shot keys
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum OneShotState<T> {
    /// First one shot key press
    Initial(T),
    /// One shot key was released before any other key, normal one shot behavior
    Single(T),
    /// Another key was pressed before one shot key was released, treat as a normal layer
    Held(T),
    /// One shot inactive
    #[default]
    None,
}

impl<T> OneShotState<T> {
    /// Get the current one shot value if any
    pub(crate) fn value(&self) -> Option<&T> {
        match self {
            OneShotState::Initial(v) | OneShotState::Single(v) | OneShotState::Held(v) => Some(v),
            OneShotState::None => None,
        }
    }
}

impl<const ROW: usize, const COL: usize, const NUM_LAYER: usize> Keyboard<ROW, COL, NUM_LAYER> {
    pub(crate) fn process_action_osl(&mut self, layer_num: u8, event: KeyboardEvent) {
        if event.pressed {
            // Deactivate old layer if any
            if let Some(&l) = self.osl_state.value() {
                self.keymap.deactivate_oneshot(l);
            }

            self.osl_state = match self.osl_state {
                OneShotState::None | OneShotState::Initial(_) => OneShotState::Initial(layer_num),
                OneShotState::Single(_) => OneShotState::Single(layer_num),
                OneShotState::Held(_) => OneShotState::Held(layer_num),
            };

            self.keymap.activate_oneshot(layer_num);
        } else {
            match self.osl_state {
                OneShotState::Initial(l) | OneShotState::Single(l) => {
                    self.osl_state = OneShotState::Single(l);
                    // Armed until the next key is released or the timeout elapses
                    let id = self.deadlines.next_id();
                    self.osl_id = id;
                    let scheduled = self.deadlines.schedule(Deadline {
                        at: event.time + self.keymap.behavior.one_shot.timeout,
                        pos: event.pos,
                        kind: DeadlineKind::OneShot,
                        id,
                    });
                    if !scheduled {
                        // Never left armed without a timeout
                        error!("Deadline queue is full, one shot layer {} is released", l);
                        self.osl_state = OneShotState::None;
                        self.keymap.deactivate_oneshot(l);
                    }
                }
                OneShotState::Held(l) => {
                    self.osl_state = OneShotState::None;
                    self.keymap.deactivate_oneshot(l);
                }
                OneShotState::None => (),
            }
        }
    }

    /// Called for every other key event
    pub(crate) fn update_osl(&mut self, event: KeyboardEvent) {
        match self.osl_state {
            OneShotState::Initial(l) => self.osl_state = OneShotState::Held(l),
            OneShotState::Single(layer_num) => {
                if !event.pressed {
                    self.keymap.deactivate_oneshot(layer_num);
                    self.osl_state = OneShotState::None;
                }
            }
            _ => (),
        }
    }

    pub(crate) fn osl_timeout(&mut self, id: u32) {
        if let OneShotState::Single(layer_num) = self.osl_state {
            if id == self.osl_id {
                debug!("One shot layer {} timeout", layer_num);
                self.keymap.deactivate_oneshot(layer_num);
                self.osl_state = OneShotState::None;
            }
        }
    }
}
