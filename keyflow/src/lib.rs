//! # keyflow
//!
//! The key event core of a keyboard firmware: raw `(position, pressed, time)`
//! events in, resolved `(keycode, pressed)` events out.
//!
//! ```text
//! KeyboardEvent -> ModeOverlay -> KeyMap (layer stack) -> behaviors -> ActionSink
//!                                                         ^
//!                                         DeadlineQueue --+
//! ```
//!
//! Matrix scanning and HID reporting are left to the firmware around it.

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
mod deadline;
pub mod error;
pub mod event;
pub mod keyboard;
pub mod keymap;
pub mod layout_macro;
pub mod overlay;
pub mod tap_dance;
pub mod tap_hold;

pub use keyflow_types::{action, keycode, modifier};
