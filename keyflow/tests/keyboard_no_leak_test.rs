pub mod common;

use std::collections::HashMap;

use keyflow::config::InterruptPolicy;
use keyflow::event::OutputEvent;
use keyflow::keycode::KeyCode;
use keyflow::modifier::ModifierCombination;

use crate::common::{COL, ROW, TestKeyPress, create_test_keyboard_with_policy, run_key_sequence};

/// Small deterministic generator, good enough to shuffle key events
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

/// Random presses and releases over the whole matrix, every key released at the end
fn random_sequence(seed: u64, steps: usize) -> Vec<TestKeyPress> {
    let mut rng = Lcg(seed);
    let mut held = [[false; COL]; ROW];
    let mut sequence = Vec::new();
    for _ in 0..steps {
        let row = (rng.next() % ROW as u64) as usize;
        let col = (rng.next() % COL as u64) as usize;
        // Mostly quick events, sometimes past the tapping term
        let delay = match rng.next() % 8 {
            0 => 300,
            1 => 1200,
            n => n * 15,
        };
        held[row][col] = !held[row][col];
        sequence.push(TestKeyPress {
            row: row as u8,
            col: col as u8,
            pressed: held[row][col],
            delay,
        });
    }
    for (row, cols) in held.iter().enumerate() {
        for (col, &pressed) in cols.iter().enumerate() {
            if pressed {
                sequence.push(TestKeyPress {
                    row: row as u8,
                    col: col as u8,
                    pressed: false,
                    delay: 20,
                });
            }
        }
    }
    sequence
}

fn assert_balanced(outputs: &[OutputEvent]) {
    let mut down: HashMap<(KeyCode, ModifierCombination), i32> = HashMap::new();
    for (i, e) in outputs.iter().enumerate() {
        let count = down.entry((e.code, e.modifiers)).or_default();
        *count += if e.pressed { 1 } else { -1 };
        assert!(*count >= 0, "#{} {:?} released before it was pressed", i, e);
    }
    for (key, count) in down {
        assert_eq!(count, 0, "{:?} is still pressed", key);
    }
}

fn check_no_leak(policy: InterruptPolicy) {
    for seed in 0..32 {
        let mut keyboard = create_test_keyboard_with_policy(policy);
        let sequence = random_sequence(seed, 200);
        let outputs = run_key_sequence(&mut keyboard, &sequence);
        assert_balanced(&outputs);
        assert!(keyboard.is_idle(), "seed {}: key slots left", seed);
        assert_eq!(keyboard.next_deadline(), None, "seed {}: deadlines left", seed);
    }
}

#[test]
fn test_no_leak_ignore_interrupt() {
    check_no_leak(InterruptPolicy::Ignore);
}

#[test]
fn test_no_leak_hold_on_other_press() {
    check_no_leak(InterruptPolicy::HoldOnOtherPress);
}

#[test]
fn test_no_leak_permissive_hold() {
    check_no_leak(InterruptPolicy::PermissiveHold);
}
