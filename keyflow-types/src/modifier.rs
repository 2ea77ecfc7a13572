use core::ops::BitOr;

use bitfield_struct::bitfield;
use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::keycode::KeyCode;

/// To represent all combinations of modifiers, at least 5 bits are needed.
/// 1 bit for Left/Right, 4 bits for modifier type. Represented in LSB format.
///
/// | bit4 | bit3 | bit2 | bit1 | bit0 |
/// | --- | --- | --- | --- | --- |
/// | L/R | GUI | ALT |SHIFT| CTRL|
#[bitfield(u8, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct ModifierCombination {
    #[bits(1)]
    pub ctrl: bool,
    #[bits(1)]
    pub shift: bool,
    #[bits(1)]
    pub alt: bool,
    #[bits(1)]
    pub gui: bool,
    #[bits(1)]
    pub right: bool,
    #[bits(3)]
    _reserved: u8,
}

impl BitOr for ModifierCombination {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() | rhs.into_bits())
    }
}

impl ModifierCombination {
    pub const LCTRL: Self = Self::new().with_ctrl(true);
    pub const LSHIFT: Self = Self::new().with_shift(true);
    pub const LALT: Self = Self::new().with_alt(true);
    pub const LGUI: Self = Self::new().with_gui(true);
    pub const RCTRL: Self = Self::new().with_right(true).with_ctrl(true);
    pub const RSHIFT: Self = Self::new().with_right(true).with_shift(true);
    pub const RALT: Self = Self::new().with_right(true).with_alt(true);
    pub const RGUI: Self = Self::new().with_right(true).with_gui(true);

    pub const fn new_from(right: bool, gui: bool, alt: bool, shift: bool, ctrl: bool) -> Self {
        ModifierCombination::new()
            .with_right(right)
            .with_gui(gui)
            .with_alt(alt)
            .with_shift(shift)
            .with_ctrl(ctrl)
    }

    /// No modifier bit is set. The side bit alone doesn't count.
    pub fn is_empty(self) -> bool {
        !(self.ctrl() || self.shift() || self.alt() || self.gui())
    }

    /// Modifier keycodes pressed by this combination, in ctrl, shift, alt, gui order.
    pub fn to_modifier_keycodes(self) -> Vec<KeyCode, 4> {
        let (ctrl, shift, alt, gui) = if self.right() {
            (KeyCode::RCtrl, KeyCode::RShift, KeyCode::RAlt, KeyCode::RGui)
        } else {
            (KeyCode::LCtrl, KeyCode::LShift, KeyCode::LAlt, KeyCode::LGui)
        };
        let mut keycodes = Vec::new();
        // At most four entries, the pushes can't overflow
        if self.ctrl() {
            let _ = keycodes.push(ctrl);
        }
        if self.shift() {
            let _ = keycodes.push(shift);
        }
        if self.alt() {
            let _ = keycodes.push(alt);
        }
        if self.gui() {
            let _ = keycodes.push(gui);
        }
        keycodes
    }
}
