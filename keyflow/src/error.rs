use core::fmt;

use crate::event::KeyPos;

/// Errors found while checking a keymap and its behavior config.
///
/// Any of these is fatal, the keyboard refuses to start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyflowError {
    /// A binding refers to a layer the keymap doesn't have
    UndefinedLayer { layer: u8, num_layer: usize },
    /// The tri-layer triple names the same layer twice
    TriLayerSelfReference { layers: [u8; 3] },
    /// A binding refers to a tap dance that isn't configured
    UndefinedTapDance { index: u8 },
    /// A binding refers to a mode overlay that isn't configured
    UndefinedMode { mode: u8 },
    /// An overlay entry sits outside the key matrix
    OverlaySlotOutOfRange { pos: KeyPos },
    /// An overlay entry isn't a plain key, modifier or exit
    OverlayActionNotPlain { mode: u8, pos: KeyPos },
    ZeroTappingTerm,
    EmptyKeymap,
}

impl fmt::Display for KeyflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyflowError::UndefinedLayer { layer, num_layer } => {
                write!(f, "layer {} is referenced but only {} layers are defined", layer, num_layer)
            }
            KeyflowError::TriLayerSelfReference { layers } => write!(
                f,
                "tri-layer [{}, {}, {}] must name three different layers",
                layers[0], layers[1], layers[2]
            ),
            KeyflowError::UndefinedTapDance { index } => write!(f, "tap dance {} is not defined", index),
            KeyflowError::UndefinedMode { mode } => write!(f, "mode overlay {} is not defined", mode),
            KeyflowError::OverlaySlotOutOfRange { pos } => {
                write!(f, "overlay entry at ({}, {}) is outside the matrix", pos.row, pos.col)
            }
            KeyflowError::OverlayActionNotPlain { mode, pos } => write!(
                f,
                "overlay {} entry at ({}, {}) must be a key, a modifier or an exit",
                mode, pos.row, pos.col
            ),
            KeyflowError::ZeroTappingTerm => write!(f, "tapping term must be longer than zero"),
            KeyflowError::EmptyKeymap => write!(f, "keymap has no layer"),
        }
    }
}

impl core::error::Error for KeyflowError {}
