use embassy_time::Instant;
use keyflow::error::KeyflowError;
use keyflow::event::{KeyboardEvent, OutputEvent};
use keyflow::keyboard::Keyboard;
use keyflow_config::{ConfigError, KeyboardTomlConfig};
use keyflow_types::keycode::KeyCode;
use keyflow_types::modifier::ModifierCombination;

const ROW: usize = 2;
const COL: usize = 6;
const NUM_LAYER: usize = 5;

fn lulu() -> KeyboardTomlConfig {
    KeyboardTomlConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/lulu.toml")).unwrap()
}

fn keyboard() -> Keyboard<ROW, COL, NUM_LAYER> {
    lulu().build_keyboard().unwrap()
}

/// `(row, col, pressed, delay ms)`, then wait until every deadline is due
fn run(keyboard: &mut Keyboard<ROW, COL, NUM_LAYER>, sequence: &[(u8, u8, bool, u64)]) -> Vec<OutputEvent> {
    let mut outputs = Vec::new();
    let mut sink = |e: OutputEvent| outputs.push(e);
    let mut now = 0;
    for &(row, col, pressed, delay) in sequence {
        now += delay;
        keyboard.process(KeyboardEvent::key(row, col, pressed, Instant::from_millis(now)), &mut sink);
    }
    keyboard.poll(Instant::from_millis(now + 5000), &mut sink);
    outputs
}

fn tap(code: KeyCode) -> Vec<OutputEvent> {
    vec![OutputEvent::key(code, true), OutputEvent::key(code, false)]
}

fn tap_with(code: KeyCode, modifiers: ModifierCombination) -> Vec<OutputEvent> {
    vec![
        OutputEvent::with_modifiers(code, modifiers, true),
        OutputEvent::with_modifiers(code, modifiers, false),
    ]
}

#[test]
fn test_plain_keys() {
    let mut keyboard = keyboard();
    let outputs = run(&mut keyboard, &[(1, 0, true, 10), (1, 0, false, 20)]);
    assert_eq!(outputs, tap(KeyCode::A));
}

#[test]
fn test_tap_dance_function_keys() {
    let mut keyboard = keyboard();
    // Single tap: volume up
    let outputs = run(&mut keyboard, &[(0, 0, true, 10), (0, 0, false, 20)]);
    assert_eq!(outputs, tap(KeyCode::AudioVolUp));

    let mut keyboard = self::keyboard();
    // Double tap: F1
    let outputs = run(
        &mut keyboard,
        &[(0, 0, true, 10), (0, 0, false, 20), (0, 0, true, 20), (0, 0, false, 20)],
    );
    assert_eq!(outputs, tap(KeyCode::F1));

    let mut keyboard = self::keyboard();
    // Single tap is transparent in the second one
    let outputs = run(&mut keyboard, &[(0, 1, true, 10), (0, 1, false, 20)]);
    assert!(outputs.is_empty());
}

#[test]
fn test_tri_layer() {
    let mut keyboard = keyboard();
    let outputs = run(
        &mut keyboard,
        &[
            (0, 2, true, 10),  // Hold LT(lower, Esc)
            (0, 3, true, 300), // MO(raise)
            (1, 2, true, 10),  // Adjust: volume up
            (1, 2, false, 10),
            (0, 3, false, 10),
            (0, 2, false, 10),
        ],
    );
    assert_eq!(outputs, tap(KeyCode::AudioVolUp));
}

#[test]
fn test_lower_layer_modified_keys() {
    let mut keyboard = keyboard();
    let outputs = run(
        &mut keyboard,
        &[
            (0, 2, true, 10),  // Hold LT(lower, Esc)
            (1, 4, true, 300), // Next desktop
            (1, 4, false, 10),
            (1, 5, true, 10), // XXXXXXX
            (1, 5, false, 10),
            (0, 2, false, 10),
        ],
    );
    let all = ModifierCombination::LCTRL | ModifierCombination::LALT | ModifierCombination::LGUI;
    assert_eq!(outputs, tap_with(KeyCode::Right, all));
}

#[test]
fn test_esc_tap() {
    let mut keyboard = keyboard();
    let outputs = run(&mut keyboard, &[(0, 2, true, 10), (0, 2, false, 50)]);
    assert_eq!(outputs, tap(KeyCode::Escape));
}

#[test]
fn test_toggled_layout() {
    let mut keyboard = keyboard();
    let outputs = run(
        &mut keyboard,
        &[
            (0, 4, true, 10), // TG(workman)
            (0, 4, false, 10),
            (1, 2, true, 10), // H instead of D
            (1, 2, false, 10),
        ],
    );
    assert_eq!(outputs, tap(KeyCode::H));
}

#[test]
fn test_vim_mode() {
    let mut keyboard = keyboard();
    let outputs = run(
        &mut keyboard,
        &[
            (0, 5, true, 10), // MODE(vim)
            (0, 5, false, 10),
            (1, 0, true, 10), // Word left
            (1, 0, false, 10),
            (1, 2, true, 10), // Down
            (1, 2, false, 10),
            (0, 5, true, 10), // EXIT
            (0, 5, false, 10),
            (1, 0, true, 10), // A again
            (1, 0, false, 10),
        ],
    );
    let mut expected = tap_with(KeyCode::Left, ModifierCombination::LALT);
    expected.extend(tap(KeyCode::Down));
    expected.extend(tap(KeyCode::A));
    assert_eq!(outputs, expected);
    assert_eq!(keyboard.active_mode(), None);
}

#[test]
fn test_wrong_dimensions() {
    assert!(matches!(
        lulu().build_keyboard::<2, 6, 4>(),
        Err(ConfigError::Dimension { expected: 4, actual: 5, .. })
    ));
    assert!(matches!(
        lulu().build_keyboard::<3, 4, 5>(),
        Err(ConfigError::Dimension { expected: 3, actual: 2, .. })
    ));
}

#[test]
fn test_keymap_errors_are_reported() {
    let undefined_layer: KeyboardTomlConfig = r#"
        [layout]
        rows = 1
        cols = 2
        layers = 2

        [[layer]]
        keys = "A MO(3)"
    "#
    .parse()
    .unwrap();
    assert!(matches!(
        undefined_layer.build_keymap::<1, 2, 2>(),
        Err(ConfigError::Keyflow(KeyflowError::UndefinedLayer { layer: 3, .. }))
    ));

    let undefined_tap_dance: KeyboardTomlConfig = r#"
        [layout]
        rows = 1
        cols = 2
        layers = 1

        [[layer]]
        keys = "A TD(0)"
    "#
    .parse()
    .unwrap();
    assert!(matches!(
        undefined_tap_dance.build_keymap::<1, 2, 1>(),
        Err(ConfigError::Keyflow(KeyflowError::UndefinedTapDance { index: 0 }))
    ));
}

#[test]
fn test_wrong_number_of_keys() {
    let config: KeyboardTomlConfig = r#"
        [layout]
        rows = 1
        cols = 2
        layers = 1

        [[layer]]
        keys = "A B C"
    "#
    .parse()
    .unwrap();
    assert!(matches!(
        config.build_keymap::<1, 2, 1>(),
        Err(ConfigError::Dimension { expected: 2, actual: 3, .. })
    ));
}
