pub mod common;

use keyflow::event::OutputEvent;
use keyflow::keycode::KeyCode;
use keyflow::modifier::ModifierCombination;

use crate::common::{create_test_keyboard, run_key_sequence, run_key_sequence_at};

fn alt_left(pressed: bool) -> OutputEvent {
    OutputEvent::with_modifiers(KeyCode::Left, ModifierCombination::LALT, pressed)
}

#[test]
fn test_overlay_remaps_its_slots_only() {
    let mut keyboard = create_test_keyboard();
    let outputs = run_key_sequence(
        &mut keyboard,
        &key_sequence![
            [2, 1, true, 10], // Enter vim mode
            [2, 1, false, 10],
            [0, 0, true, 10], // Remapped, base A never fires
            [0, 0, false, 10],
            [0, 1, true, 10], // Remapped, base B never fires
            [0, 1, false, 10],
            [0, 2, true, 10], // Not in the overlay, LT(lower, Esc) taps
            [0, 2, false, 10],
        ],
    );
    assert_eq!(keyboard.active_mode(), Some(0));
    assert_eq!(
        outputs,
        vec![
            alt_left(true),
            alt_left(false),
            OutputEvent::key(KeyCode::Down, true),
            OutputEvent::key(KeyCode::Down, false),
            OutputEvent::key(KeyCode::Escape, true),
            OutputEvent::key(KeyCode::Escape, false),
        ]
    );
}

#[test]
fn test_overlay_exit() {
    let mut keyboard = create_test_keyboard();
    run_key_sequence(
        &mut keyboard,
        &key_sequence![
            [2, 1, true, 10], // Enter vim mode
            [2, 1, false, 10],
        ],
    );
    assert_eq!(keyboard.active_mode(), Some(0));

    // The exit slot is MODE(0) on the base layer, which would enter the mode again
    let outputs = run_key_sequence_at(
        &mut keyboard,
        10_000,
        &key_sequence![
            [2, 1, true, 10],
            [2, 1, false, 10],
            [0, 0, true, 10], // A again
            [0, 0, false, 10],
        ],
    );
    assert_eq!(keyboard.active_mode(), None);
    assert_eq!(outputs, key_output![[A, true], [A, false]]);
}

#[test]
fn test_remapped_key_released_after_exit() {
    let mut keyboard = create_test_keyboard();
    let outputs = run_key_sequence(
        &mut keyboard,
        &key_sequence![
            [2, 1, true, 10], // Enter vim mode
            [2, 1, false, 10],
            [0, 0, true, 10], // Hold remapped key
            [2, 1, true, 10], // Exit
            [2, 1, false, 10],
            [0, 0, false, 10], // The remapped key is released, not A
        ],
    );
    assert_eq!(keyboard.active_mode(), None);
    assert_eq!(outputs, vec![alt_left(true), alt_left(false)]);
}

#[test]
fn test_key_held_before_entering_overlay() {
    let mut keyboard = create_test_keyboard();
    let outputs = run_key_sequence(
        &mut keyboard,
        &key_sequence![
            [0, 0, true, 10], // A
            [2, 1, true, 10], // Enter vim mode
            [2, 1, false, 10],
            [0, 0, false, 10], // Release A, the overlay only takes new presses
        ],
    );
    assert_eq!(
        outputs,
        vec![OutputEvent::key(KeyCode::A, true), OutputEvent::key(KeyCode::A, false)]
    );
}

#[test]
fn test_overlay_above_layers() {
    let mut keyboard = create_test_keyboard();
    let outputs = run_key_sequence(
        &mut keyboard,
        &key_sequence![
            [2, 1, true, 10], // Enter vim mode
            [2, 1, false, 10],
            [0, 3, true, 10], // MO(raise) passes through
            [0, 0, true, 10], // Still remapped, F1 on raise doesn't fire
            [0, 0, false, 10],
            [0, 3, false, 10],
        ],
    );
    assert_eq!(outputs, vec![alt_left(true), alt_left(false)]);
    assert!(keyboard.is_idle());
}
