//! Checks on a keyboard file before anything is built.
//!
//! References between keys, layers and tap dances are checked again by
//! `KeyMap::new` once the keymap is built.

use std::collections::HashSet;

use keyflow::overlay::OVERLAY_MAX_NUM;
use keyflow::tap_dance::{TAP_DANCE_MAX_NUM, TAP_DANCE_MAX_TAPS};

use crate::KeyboardTomlConfig;
use crate::error::{ConfigError, ConfigResult};

/// Validates the entire keyboard configuration
pub fn validate_config(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    validate_layout_section(config)?;
    validate_names(config)?;
    validate_behavior_section(config)?;
    validate_overlay_section(config)?;
    Ok(())
}

/// Validates the [layout] section and the number of [[layer]] entries
fn validate_layout_section(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    let layout = &config.layout;
    for (field, value) in [
        ("layout.rows", layout.rows),
        ("layout.cols", layout.cols),
        ("layout.layers", layout.layers),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation {
                field: field.to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
    }

    if config.layer.len() > layout.layers as usize {
        return Err(ConfigError::Validation {
            field: "layer".to_string(),
            message: format!(
                "{} [[layer]] entries, but layout.layers is {}",
                config.layer.len(),
                layout.layers
            ),
        });
    }
    Ok(())
}

/// Layer and mode names must be unique, and must not look like an index
fn validate_names(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    let layer_names = config.layer.iter().filter_map(|l| l.name.as_deref());
    check_unique_names("layer.name", layer_names)?;
    let mode_names = config.overlay.iter().filter_map(|o| o.name.as_deref());
    check_unique_names("overlay.name", mode_names)
}

fn check_unique_names<'a>(field: &str, names: impl Iterator<Item = &'a str>) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ConfigError::Validation {
                field: field.to_string(),
                message: format!("'{}' is not a valid name, use letters, digits and '_'", name),
            });
        }
        if !seen.insert(name) {
            return Err(ConfigError::Validation {
                field: field.to_string(),
                message: format!("duplicate name '{}'", name),
            });
        }
    }
    Ok(())
}

/// Validates the [behavior] section
fn validate_behavior_section(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    let behavior = &config.behavior;

    if behavior.tap_hold.tapping_term.as_ref().is_some_and(|t| t.0 == 0) {
        return Err(ConfigError::Validation {
            field: "behavior.tap_hold.tapping_term".to_string(),
            message: "must be greater than 0".to_string(),
        });
    }

    if behavior.tap_hold.tapping_toggle == 0 {
        return Err(ConfigError::Validation {
            field: "behavior.tap_hold.tapping_toggle".to_string(),
            message: "must be greater than 0".to_string(),
        });
    }

    if behavior.tap_dance.len() > TAP_DANCE_MAX_NUM {
        return Err(ConfigError::Validation {
            field: "behavior.tap_dance".to_string(),
            message: format!("at most {} tap dances are supported", TAP_DANCE_MAX_NUM),
        });
    }

    for (i, tap_dance) in behavior.tap_dance.iter().enumerate() {
        if tap_dance.taps.is_empty() || tap_dance.taps.len() > TAP_DANCE_MAX_TAPS {
            return Err(ConfigError::Validation {
                field: format!("behavior.tap_dance[{}].taps", i),
                message: format!("must have 1 to {} entries", TAP_DANCE_MAX_TAPS),
            });
        }
    }
    Ok(())
}

/// Validates the [[overlay]] entries
fn validate_overlay_section(config: &KeyboardTomlConfig) -> ConfigResult<()> {
    if config.overlay.len() > OVERLAY_MAX_NUM {
        return Err(ConfigError::Validation {
            field: "overlay".to_string(),
            message: format!("at most {} overlays are supported", OVERLAY_MAX_NUM),
        });
    }
    Ok(())
}
