use embassy_time::Instant;
use keyflow_types::action::Action;

use crate::config::InterruptPolicy;

/// State of a tap-hold key, from its press to its release
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapHoldState {
    Idle,
    /// Pressed, neither tap nor hold is decided yet
    Pending { press_time: Instant, id: u32 },
    /// Released within the tapping term
    TapFired,
    /// The hold action is pressed and waits for the key release
    HoldFired,
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapHoldDecision {
    /// Press and release the tap action
    Tap(Action),
    /// Press the hold action
    Hold(Action),
    /// Release the hold action
    ReleaseHold(Action),
    /// Keep the interrupting event until the tap-hold key is decided
    Buffer,
    /// Nothing to do for the tap-hold key
    Ignore,
}

/// A pressed tap-hold key
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TapHoldKey {
    pub tap: Action,
    pub hold: Action,
    pub state: TapHoldState,
}

impl TapHoldKey {
    pub fn press(tap: Action, hold: Action, press_time: Instant, id: u32) -> Self {
        Self {
            tap,
            hold,
            state: TapHoldState::Pending { press_time, id },
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TapHoldState::Pending { .. })
    }

    /// The tapping term scheduled with `id` elapsed.
    ///
    /// Returns `None` if the deadline is stale.
    pub fn on_timeout(&mut self, id: u32) -> Option<TapHoldDecision> {
        match self.state {
            TapHoldState::Pending { id: pending_id, .. } if pending_id == id => {
                self.state = TapHoldState::HoldFired;
                Some(TapHoldDecision::Hold(self.hold))
            }
            _ => None,
        }
    }

    /// The tap-hold key itself is released
    pub fn on_release(&mut self) -> TapHoldDecision {
        match self.state {
            TapHoldState::Pending { .. } => {
                self.state = TapHoldState::TapFired;
                TapHoldDecision::Tap(self.tap)
            }
            TapHoldState::HoldFired => {
                self.state = TapHoldState::Idle;
                TapHoldDecision::ReleaseHold(self.hold)
            }
            TapHoldState::TapFired | TapHoldState::Idle => TapHoldDecision::Ignore,
        }
    }

    /// Another key is pressed while this one is held.
    ///
    /// Unless the press decides hold right away, the other key waits until
    /// this one is decided, so that a fast roll keeps its order.
    pub fn on_other_press(&mut self, policy: InterruptPolicy) -> TapHoldDecision {
        if !self.is_pending() {
            return TapHoldDecision::Ignore;
        }
        match policy {
            InterruptPolicy::Ignore | InterruptPolicy::PermissiveHold => TapHoldDecision::Buffer,
            InterruptPolicy::HoldOnOtherPress => self.force_hold(),
        }
    }

    /// Decide hold now. Permissive hold does this once an interrupting key is released first
    pub fn force_hold(&mut self) -> TapHoldDecision {
        if !self.is_pending() {
            return TapHoldDecision::Ignore;
        }
        self.state = TapHoldState::HoldFired;
        TapHoldDecision::Hold(self.hold)
    }
}
