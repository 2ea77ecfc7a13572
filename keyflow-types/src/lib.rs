//! # keyflow types
//!
//! Fundamental type definitions shared by the keyflow crates.
//!
//! - [`action`] - Actions and the per-slot key behaviors built from them
//! - [`keycode`] - HID keycodes, including media and brightness keys
//! - [`modifier`] - Modifier key combinations
//!
//! `keyflow` consumes these types at runtime, `keyflow-config` produces them
//! from a keyboard TOML file.

#![no_std]

pub mod action;
pub mod keycode;
pub mod modifier;
