pub mod test_macro;

use embassy_time::{Duration, Instant};
use keyflow::action::{Action, KeyAction};
use keyflow::config::{BehaviorConfig, InterruptPolicy};
use keyflow::event::{KeyPos, KeyboardEvent, OutputEvent};
use keyflow::keyboard::Keyboard;
use keyflow::keycode::KeyCode;
use keyflow::keymap::KeyMap;
use keyflow::modifier::ModifierCombination;
use keyflow::overlay::{OverlayAction, OverlayMap};
use keyflow::tap_dance::TapDance;
use keyflow::{a, df, k, layer, lt, mo, mode, mt, osl, td, tg, tt};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const ROW: usize = 3;
pub const COL: usize = 4;
pub const NUM_LAYER: usize = 5;

pub const LOWER: u8 = 1;
pub const RAISE: u8 = 2;
pub const ADJUST: u8 = 3;
pub const WORKMAN: u8 = 4;

/// Time to wait after a sequence, every pending deadline is due by then
pub const SETTLE_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct TestKeyPress {
    pub row: u8,
    pub col: u8,
    pub pressed: bool,
    pub delay: u64, // Delay before this key event in milliseconds
}

/// Feed a key sequence to the keyboard, then let every deadline fire.
pub fn run_key_sequence<const R: usize, const C: usize, const L: usize>(
    keyboard: &mut Keyboard<R, C, L>,
    key_sequence: &[TestKeyPress],
) -> Vec<OutputEvent> {
    run_key_sequence_at(keyboard, 0, key_sequence)
}

/// Same as [`run_key_sequence`], with delays counted from `start` ms
pub fn run_key_sequence_at<const R: usize, const C: usize, const L: usize>(
    keyboard: &mut Keyboard<R, C, L>,
    start: u64,
    key_sequence: &[TestKeyPress],
) -> Vec<OutputEvent> {
    let mut outputs = Vec::new();
    let mut sink = |e: OutputEvent| outputs.push(e);
    let mut now = start;
    for key in key_sequence {
        now += key.delay;
        keyboard.process(
            KeyboardEvent::key(key.row, key.col, key.pressed, Instant::from_millis(now)),
            &mut sink,
        );
    }
    keyboard.poll(Instant::from_millis(now + SETTLE_MS), &mut sink);
    outputs
}

/// ```text
/// row 0: A        B      LT(lower, Esc)  MO(raise)
/// row 1: MT(C, LShift)  TD(0)  TD(1)  TT(workman)
/// row 2: OSL(lower)  MODE(0)  TG(workman)  DF(workman)
/// ```
///
/// Tri-layer: lower + raise = adjust.
#[rustfmt::skip]
pub fn get_keymap() -> [[[KeyAction; COL]; ROW]; NUM_LAYER] {
    [
        layer!([
            [k!(A), k!(B), lt!(1, Escape), mo!(2)],
            [mt!(C, ModifierCombination::LSHIFT), td!(0), td!(1), tt!(4)],
            [osl!(1), mode!(0), tg!(4), df!(4)]
        ]),
        layer!([
            [k!(Kc1), k!(Kc2), a!(Transparent), a!(Transparent)],
            [k!(Kc3), a!(Transparent), a!(Transparent), a!(Transparent)],
            [a!(Transparent), a!(Transparent), a!(Transparent), a!(Transparent)]
        ]),
        layer!([
            [k!(F1), a!(No), a!(Transparent), a!(Transparent)],
            [k!(F2), a!(Transparent), a!(Transparent), a!(Transparent)],
            [a!(Transparent), a!(Transparent), a!(Transparent), a!(Transparent)]
        ]),
        layer!([
            [k!(F12), a!(Transparent), a!(Transparent), a!(Transparent)],
            [a!(Transparent), a!(Transparent), a!(Transparent), a!(Transparent)],
            [a!(Transparent), a!(Transparent), a!(Transparent), a!(Transparent)]
        ]),
        layer!([
            [k!(D), a!(Transparent), a!(Transparent), a!(Transparent)],
            [a!(Transparent), a!(Transparent), a!(Transparent), a!(Transparent)],
            [a!(Transparent), a!(Transparent), a!(Transparent), df!(0)]
        ]),
    ]
}

/// Volume up on tap, F3 on double tap, like the function row of a split board
pub fn volume_f3() -> TapDance {
    TapDance::double(Action::Key(KeyCode::AudioVolUp), Action::Key(KeyCode::F3))
}

/// E, F on double tap, left ctrl when held
pub fn e_f_ctrl() -> TapDance {
    TapDance::new(
        &[Action::Key(KeyCode::E), Action::Key(KeyCode::F)],
        Action::Modifier(ModifierCombination::LCTRL),
    )
}

/// A vim-like overlay: hjkl-ish navigation on the first row
pub fn vim_overlay() -> OverlayMap {
    OverlayMap::new()
        .bind(
            KeyPos::new(0, 0),
            OverlayAction::Remap(Action::KeyWithModifier(KeyCode::Left, ModifierCombination::LALT)),
        )
        .bind(KeyPos::new(0, 1), OverlayAction::Remap(Action::Key(KeyCode::Down)))
        .bind(KeyPos::new(2, 1), OverlayAction::Exit)
}

pub fn create_test_behavior(policy: InterruptPolicy) -> BehaviorConfig {
    let mut behavior = BehaviorConfig::default();
    behavior.tri_layer = Some([LOWER, RAISE, ADJUST]);
    behavior.tap_hold.interrupt_policy = policy;
    behavior.tap_hold.tapping_term = Duration::from_millis(245);
    behavior.tap_dance.tap_dances.push(volume_f3()).unwrap();
    behavior.tap_dance.tap_dances.push(e_f_ctrl()).unwrap();
    behavior.overlay.overlays.push(vim_overlay()).unwrap();
    behavior
}

pub fn create_test_keyboard_with_policy(policy: InterruptPolicy) -> Keyboard<ROW, COL, NUM_LAYER> {
    let keymap = KeyMap::new(get_keymap(), create_test_behavior(policy)).unwrap();
    Keyboard::new(keymap)
}

pub fn create_test_keyboard() -> Keyboard<ROW, COL, NUM_LAYER> {
    create_test_keyboard_with_policy(InterruptPolicy::Ignore)
}
