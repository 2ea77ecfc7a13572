use embassy_time::Instant;
use heapless::Vec;
use keyflow_types::action::Action;

/// Max number of tap dances
pub const TAP_DANCE_MAX_NUM: usize = 16;
/// Max number of tap positions in one tap dance
pub const TAP_DANCE_MAX_TAPS: usize = 4;

/// A tap dance: the n-th tap position triggers `taps[n - 1]`.
///
/// `hold` is triggered instead when the key is still held once the tapping
/// term after the last tap elapses. Taps beyond `taps.len()` do nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TapDance {
    pub taps: Vec<Action, TAP_DANCE_MAX_TAPS>,
    pub hold: Action,
}

impl Default for TapDance {
    fn default() -> Self {
        Self {
            taps: Vec::new(),
            hold: Action::No,
        }
    }
}

impl TapDance {
    /// Extra taps beyond `TAP_DANCE_MAX_TAPS` are dropped
    pub fn new(taps: &[Action], hold: Action) -> Self {
        if taps.len() > TAP_DANCE_MAX_TAPS {
            warn!("Tap dance supports at most {} taps", TAP_DANCE_MAX_TAPS);
        }
        Self {
            taps: taps.iter().take(TAP_DANCE_MAX_TAPS).copied().collect(),
            hold,
        }
    }

    /// One action on single tap, another on double tap
    pub fn double(tap: Action, double_tap: Action) -> Self {
        Self::new(&[tap, double_tap], Action::No)
    }

    pub fn has_hold(&self) -> bool {
        !matches!(self.hold, Action::No | Action::Transparent)
    }

    /// The action for a sequence of `count` taps.
    ///
    /// `held` means the key is still down when the sequence ends by timeout.
    pub fn resolve(&self, count: u8, held: bool) -> Action {
        if held && self.has_hold() {
            return self.hold;
        }
        match self.taps.get((count as usize).wrapping_sub(1)) {
            Some(Action::Transparent) | None => Action::No,
            Some(&action) => action,
        }
    }
}

/// State of a tap dance key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapDanceState {
    Idle,
    /// Taps counted so far, waiting for the next one
    Counting {
        count: u8,
        last_tap: Instant,
        id: u32,
        pressed: bool,
    },
    /// The resolved action is pressed and waits for the key release
    Resolved { action: Action },
}

/// A tap dance key with an unfinished sequence or a held result
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TapDanceKey {
    pub index: u8,
    pub state: TapDanceState,
}

impl TapDanceKey {
    pub fn new(index: u8) -> Self {
        Self {
            index,
            state: TapDanceState::Idle,
        }
    }

    /// Count a tap, returns the tap count so far
    pub fn on_press(&mut self, now: Instant, id: u32) -> u8 {
        let count = match self.state {
            TapDanceState::Counting { count, .. } => count.saturating_add(1),
            _ => 1,
        };
        self.state = TapDanceState::Counting {
            count,
            last_tap: now,
            id,
            pressed: true,
        };
        count
    }

    /// Returns the action to release if the tap dance was resolved while the key was held
    pub fn on_release(&mut self) -> Option<Action> {
        match &mut self.state {
            TapDanceState::Counting { pressed, .. } => {
                *pressed = false;
                None
            }
            TapDanceState::Resolved { action } => {
                let action = *action;
                self.state = TapDanceState::Idle;
                Some(action)
            }
            TapDanceState::Idle => None,
        }
    }

    pub fn is_counting(&self) -> bool {
        matches!(self.state, TapDanceState::Counting { .. })
    }

    /// End the tap sequence.
    ///
    /// With `id` given, only the deadline scheduled for the last tap may end
    /// it: the key is then resolved by timeout, or by hold if it is still
    /// pressed. Without `id`, another key interrupted the sequence.
    ///
    /// Returns the action and whether the key is still pressed, `None` if
    /// there is nothing to resolve.
    pub fn resolve(&mut self, tap_dance: &TapDance, id: Option<u32>) -> Option<(Action, bool)> {
        let TapDanceState::Counting {
            count,
            id: last_id,
            pressed,
            ..
        } = self.state
        else {
            return None;
        };
        if id.is_some_and(|id| id != last_id) {
            return None;
        }

        let action = tap_dance.resolve(count, pressed && id.is_some());
        self.state = if pressed {
            TapDanceState::Resolved { action }
        } else {
            TapDanceState::Idle
        };
        Some((action, pressed))
    }
}
