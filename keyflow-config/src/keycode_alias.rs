use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Lowercase key names, QMK short names included, to `KeyCode` variant names.
///
/// A `KC_` prefix is stripped before the lookup.
pub static KEYCODE_ALIAS: Lazy<HashMap<&str, &str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    macro_rules! add_alias {
        ($keycode:tt) => {
            m.insert(paste::paste!{ stringify!([<$keycode:lower>]) }, $keycode);
        };
        ($keycode:tt = $( $alias:expr),*) => {
            add_alias!($keycode);
            $(
                m.insert($alias, $keycode);
            )*
        };
    }

    add_alias!("No" = "xxxxxxx");
    add_alias!("Kc1" = "1");
    add_alias!("Kc2" = "2");
    add_alias!("Kc3" = "3");
    add_alias!("Kc4" = "4");
    add_alias!("Kc5" = "5");
    add_alias!("Kc6" = "6");
    add_alias!("Kc7" = "7");
    add_alias!("Kc8" = "8");
    add_alias!("Kc9" = "9");
    add_alias!("Kc0" = "0");
    add_alias!("Enter" = "ent");
    add_alias!("Escape" = "esc");
    add_alias!("Backspace" = "bspc");
    add_alias!("Tab");
    add_alias!("Space" = "spc");
    add_alias!("Minus" = "mins");
    add_alias!("Equal" = "eql");
    add_alias!("LeftBracket" = "left_bracket", "lbrc");
    add_alias!("RightBracket" = "right_bracket", "rbrc");
    add_alias!("Backslash" = "bsls");
    add_alias!("NonusHash" = "nonus_hash", "nuhs");
    add_alias!("Semicolon" = "scln");
    add_alias!("Quote" = "quot");
    add_alias!("Grave" = "grv");
    add_alias!("Comma" = "comm");
    add_alias!("Dot" = "dot");
    add_alias!("Slash" = "slsh");
    add_alias!("CapsLock" = "caps_lock", "caps");
    add_alias!("PrintScreen" = "print_screen", "pscr");
    add_alias!("ScrollLock" = "scroll_lock", "scrl");
    add_alias!("Pause" = "paus");
    add_alias!("Insert" = "ins");
    add_alias!("Home");
    add_alias!("PageUp" = "page_up", "pgup");
    add_alias!("Delete" = "del");
    add_alias!("End");
    add_alias!("PageDown" = "page_down", "pgdn");
    add_alias!("Right" = "rght");
    add_alias!("Left");
    add_alias!("Down");
    add_alias!("Up");
    add_alias!("NumLock" = "num_lock", "num");
    add_alias!("Application" = "app");
    add_alias!("AudioMute" = "audio_mute", "mute");
    add_alias!("AudioVolUp" = "audio_vol_up", "volu");
    add_alias!("AudioVolDown" = "audio_vol_down", "vold");
    add_alias!("MediaNextTrack" = "media_next_track", "mnxt");
    add_alias!("MediaPrevTrack" = "media_prev_track", "mprv");
    add_alias!("MediaStop" = "media_stop", "mstp");
    add_alias!("MediaPlayPause" = "media_play_pause", "mply");
    add_alias!("BrightnessUp" = "brightness_up", "briu");
    add_alias!("BrightnessDown" = "brightness_down", "brid");
    add_alias!("LCtrl" = "l_ctrl", "leftctrl", "left_ctrl", "lctl");
    add_alias!("LShift" = "l_shift", "leftshift", "left_shift", "lsft");
    add_alias!("LAlt" = "l_alt", "leftalt", "left_alt", "lopt");
    add_alias!("LGui" = "l_gui", "leftgui", "left_gui", "lcmd", "lwin");
    add_alias!("RCtrl" = "r_ctrl", "rightctrl", "right_ctrl", "rctl");
    add_alias!("RShift" = "r_shift", "rightshift", "right_shift", "rsft");
    add_alias!("RAlt" = "r_alt", "rightalt", "right_alt", "ropt", "algr");
    add_alias!("RGui" = "r_gui", "rightgui", "right_gui", "rcmd", "rwin");

    m
});
