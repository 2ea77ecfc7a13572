use embassy_time::Duration;
use heapless::Vec;

use crate::overlay::{OVERLAY_MAX_NUM, OverlayMap};
use crate::tap_dance::{TAP_DANCE_MAX_NUM, TapDance};

/// Config for configurable action behavior
#[derive(Clone, Debug, Default)]
pub struct BehaviorConfig {
    /// `[lower, upper, adjust]`: adjust is active whenever lower and upper both are
    pub tri_layer: Option<[u8; 3]>,
    pub tap_hold: TapHoldConfig,
    pub one_shot: OneShotConfig,
    pub tap_dance: TapDancesConfig,
    pub overlay: OverlaysConfig,
}

/// How a pending tap-hold key reacts to other keys pressed before its tapping term elapses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptPolicy {
    /// Other keys are processed normally, the decision is made on release or timeout.
    #[default]
    Ignore,
    /// Same as QMK's permissive hold: another key pressed and released while the
    /// tap-hold key is held triggers the hold action.
    PermissiveHold,
    /// Any other key press triggers the hold action immediately.
    HoldOnOtherPress,
}

/// Configurations for tap hold behavior
#[derive(Clone, Copy, Debug)]
pub struct TapHoldConfig {
    /// Shared by tap-hold, tap dance and tap toggle keys
    pub tapping_term: Duration,
    pub interrupt_policy: InterruptPolicy,
    /// Number of taps that toggle a tap-toggle layer
    pub tapping_toggle: u8,
}

impl Default for TapHoldConfig {
    fn default() -> Self {
        Self {
            tapping_term: Duration::from_millis(245),
            interrupt_policy: InterruptPolicy::Ignore,
            tapping_toggle: 3,
        }
    }
}

/// Config for one shot behavior
#[derive(Clone, Copy, Debug)]
pub struct OneShotConfig {
    pub timeout: Duration,
}

impl Default for OneShotConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
        }
    }
}

/// Config for tap dance behavior
#[derive(Clone, Debug, Default)]
pub struct TapDancesConfig {
    pub tap_dances: Vec<TapDance, TAP_DANCE_MAX_NUM>,
}

/// Config for mode overlays, `Action::ModeToggle(i)` refers to `overlays[i]`
#[derive(Clone, Debug, Default)]
pub struct OverlaysConfig {
    pub overlays: Vec<OverlayMap, OVERLAY_MAX_NUM>,
}
