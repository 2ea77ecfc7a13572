extern crate keyflow;

#[macro_export]
macro_rules! key_sequence_test {
    (keyboard: $keyboard:expr, sequence: [$([$row:expr, $col:expr, $pressed:expr, $delay:expr]),* $(,)?], expected_outputs: [$([$code:ident, $out_pressed:expr]),* $(,)?]) => {
        let mut keyboard = $keyboard;
        let sequence = $crate::key_sequence![$([$row, $col, $pressed, $delay]),*];
        let expected_outputs: Vec<keyflow::event::OutputEvent> = $crate::key_output![$([$code, $out_pressed]),*];

        let outputs = $crate::common::run_key_sequence(&mut keyboard, &sequence);
        assert_eq!(expected_outputs, outputs, "expected left but actually right");
        assert!(keyboard.is_idle(), "key slots left after the sequence");
    };
}

// a rust macro to create a key sequence to simulate key presses
#[macro_export]
macro_rules! key_sequence {
    ($([$row:expr, $col:expr, $pressed:expr, $delay:expr]),* $(,)?) => {
        vec![
            $(
                $crate::common::TestKeyPress {
                    row: $row,
                    col: $col,
                    pressed: $pressed,
                    delay: $delay,
                },
            )*
        ]
    };
}

// a rust macro to create plain key outputs, eg. `[A, true]`
#[macro_export]
macro_rules! key_output {
    ($([$code:ident, $pressed:expr]),* $(,)?) => {
        vec![
            $(
                keyflow::event::OutputEvent::key(keyflow::keycode::KeyCode::$code, $pressed),
            )*
        ]
    };
}
