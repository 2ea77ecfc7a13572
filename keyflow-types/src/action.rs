//! Keyboard actions and behaviors.
//!
//! Key types:
//! - [`Action`] - Single operations that a key emits or executes
//! - [`KeyAction`] - The behavior bound to a key slot on one layer

use serde::{Deserialize, Serialize};

use crate::keycode::KeyCode;
use crate::modifier::ModifierCombination;

/// A KeyAction is the behavior bound to a key position on one layer.
///
/// A key action decides *when* its inner [`Action`]s are triggered: a single
/// action follows the physical key, a tap-hold picks one of two actions by
/// press duration, a tap dance picks by tap count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyAction {
    /// No action. Stops the layer search, nothing is emitted.
    No,
    /// Transparent, defers to the next active layer below.
    Transparent,
    /// A single action, pressed and released with the key.
    Single(Action),
    /// Tap action on a short press, hold action once the tapping term elapses.
    TapHold(Action, Action),
    /// Tap dance, the index refers to the configured tap dance table.
    TapDance(u8),
    /// Momentary layer while held, toggles the layer after enough quick taps.
    LayerTapToggle(u8),
}

impl KeyAction {
    /// Whether the key action resolves to the next layer down.
    pub fn is_transparent(&self) -> bool {
        matches!(self, KeyAction::Transparent)
    }

    /// Whether the key action keeps per-slot timing state.
    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            KeyAction::TapHold(_, _) | KeyAction::TapDance(_) | KeyAction::LayerTapToggle(_)
        )
    }
}

/// A single basic action that a keyboard can execute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Default action, no action.
    No,
    /// Transparent action, used as the unset entry of a tap dance.
    Transparent,
    /// A normal key stroke.
    Key(KeyCode),
    /// Modifier combination, each modifier is pressed and released in order.
    Modifier(ModifierCombination),
    /// Key stroke with modifier combination triggered, eg. `LALT(Right)`.
    KeyWithModifier(KeyCode, ModifierCombination),
    /// Activate a layer while the key is held.
    LayerOn(u8),
    /// Deactivate a layer, whatever activated it.
    LayerOff(u8),
    /// Toggle a layer.
    LayerToggle(u8),
    /// Set the default layer.
    DefaultLayer(u8),
    /// Activate a layer for the next key press only.
    OneShotLayer(u8),
    /// Enter a mode overlay, or leave it if it is already active.
    ModeToggle(u8),
    /// Leave whatever mode overlay is active.
    ModeExit,
}

impl Action {
    /// Plain actions only produce output, they never touch layer or mode state.
    pub fn is_plain(&self) -> bool {
        matches!(
            self,
            Action::No | Action::Key(_) | Action::Modifier(_) | Action::KeyWithModifier(_, _)
        )
    }

    /// The layer this action refers to, if any.
    pub fn layer(&self) -> Option<u8> {
        match *self {
            Action::LayerOn(l)
            | Action::LayerOff(l)
            | Action::LayerToggle(l)
            | Action::DefaultLayer(l)
            | Action::OneShotLayer(l) => Some(l),
            _ => None,
        }
    }
}
