use embassy_time::Instant;
use keyflow_types::keycode::KeyCode;
use keyflow_types::modifier::ModifierCombination;

/// The position of a key in the matrix.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyPos {
    pub row: u8,
    pub col: u8,
}

impl KeyPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// Raw key transition delivered by the matrix scanner.
///
/// Events must arrive in timestamp order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardEvent {
    pub pos: KeyPos,
    pub pressed: bool,
    pub time: Instant,
}

impl KeyboardEvent {
    pub fn key(row: u8, col: u8, pressed: bool, time: Instant) -> Self {
        Self {
            pos: KeyPos { row, col },
            pressed,
            time,
        }
    }
}

/// A resolved keycode transition, consumed by the HID reporter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputEvent {
    pub code: KeyCode,
    /// Modifiers held together with `code`, empty for plain keys
    pub modifiers: ModifierCombination,
    pub pressed: bool,
}

impl OutputEvent {
    pub fn key(code: KeyCode, pressed: bool) -> Self {
        Self {
            code,
            modifiers: ModifierCombination::new(),
            pressed,
        }
    }

    pub fn with_modifiers(code: KeyCode, modifiers: ModifierCombination, pressed: bool) -> Self {
        Self {
            code,
            modifiers,
            pressed,
        }
    }
}

/// Receiver of the resolved output stream.
pub trait ActionSink {
    fn emit(&mut self, event: OutputEvent);
}

impl<F: FnMut(OutputEvent)> ActionSink for F {
    fn emit(&mut self, event: OutputEvent) {
        self(event)
    }
}

impl<const N: usize> ActionSink for heapless::Vec<OutputEvent, N> {
    fn emit(&mut self, event: OutputEvent) {
        if let Err(e) = self.push(event) {
            error!("Output buffer is full, dropping {:?}", e);
        }
    }
}
