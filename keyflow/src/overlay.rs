//! Mode overlays.
//!
//! A mode overlay, e.g. a vim-like navigation mode, remaps a subset of the
//! key slots while it is active. Events on those slots are consumed by the
//! overlay and never reach the layer stack.

use heapless::Vec;
use keyflow_types::action::Action;

use crate::event::KeyPos;

/// Max number of mode overlays
pub const OVERLAY_MAX_NUM: usize = 4;
/// Max number of remapped slots in one overlay
pub const OVERLAY_MAX_BINDINGS: usize = 32;
/// Max number of overlay keys held at the same time
const OVERLAY_MAX_HELD: usize = 8;

/// What an overlay slot does
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverlayAction {
    /// Emit a plain action instead of the layer binding
    Remap(Action),
    /// Leave the overlay
    Exit,
}

/// The static slot table of one overlay
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OverlayMap {
    pub bindings: Vec<(KeyPos, OverlayAction), OVERLAY_MAX_BINDINGS>,
}

impl OverlayMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a slot, a later binding of the same slot replaces the earlier one
    pub fn bind(mut self, pos: KeyPos, action: OverlayAction) -> Self {
        if let Some(entry) = self.bindings.iter_mut().find(|(p, _)| *p == pos) {
            entry.1 = action;
        } else if self.bindings.push((pos, action)).is_err() {
            warn!("Overlay supports at most {} bindings", OVERLAY_MAX_BINDINGS);
        }
        self
    }

    pub fn get(&self, pos: KeyPos) -> Option<OverlayAction> {
        self.bindings.iter().find(|(p, _)| *p == pos).map(|(_, a)| *a)
    }
}

/// Outcome of offering an event to the overlay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Intercept {
    /// Not an overlay event, resolve it normally
    PassThrough,
    /// Consumed, process the action with the event's pressed state
    Action(Action),
    /// Consumed, nothing else to do
    Consumed,
    /// An overlay slot, but no room left to track its release: the press is dropped
    Refused,
}

/// Runtime state of the mode overlays: at most one is active.
#[derive(Debug, Default)]
pub struct ModeOverlay {
    active: Option<u8>,
    /// Slots whose press was consumed, with the action to release
    held: Vec<(KeyPos, Option<Action>), OVERLAY_MAX_HELD>,
}

impl ModeOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<u8> {
        self.active
    }

    pub fn activate(&mut self, mode: u8) {
        info!("Enter mode overlay {}", mode);
        self.active = Some(mode);
    }

    pub fn deactivate(&mut self) {
        if let Some(mode) = self.active.take() {
            info!("Leave mode overlay {}", mode);
        }
    }

    /// Enter `mode`, or leave it if it is the active one
    pub fn toggle(&mut self, mode: u8) {
        if self.active == Some(mode) {
            self.deactivate();
        } else {
            self.activate(mode);
        }
    }

    /// Offer a key event to the overlay.
    ///
    /// The release of a consumed press is always consumed as well, even if the
    /// overlay was left in between, so a remapped key can't leak.
    pub fn intercept(&mut self, overlays: &[OverlayMap], pos: KeyPos, pressed: bool) -> Intercept {
        if !pressed {
            return match self.held.iter().position(|(p, _)| *p == pos) {
                Some(i) => match self.held.swap_remove(i).1 {
                    Some(action) => Intercept::Action(action),
                    None => Intercept::Consumed,
                },
                None => Intercept::PassThrough,
            };
        }

        let Some(map) = self.active.and_then(|mode| overlays.get(mode as usize)) else {
            return Intercept::PassThrough;
        };
        let Some(overlay_action) = map.get(pos) else {
            return Intercept::PassThrough;
        };

        if self.held.is_full() {
            return Intercept::Refused;
        }

        let (held_action, intercept) = match overlay_action {
            OverlayAction::Remap(action) => (Some(action), Intercept::Action(action)),
            OverlayAction::Exit => {
                self.deactivate();
                (None, Intercept::Consumed)
            }
        };
        // Can't fail, checked above
        let _ = self.held.push((pos, held_action));
        intercept
    }
}
