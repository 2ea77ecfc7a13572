use keyflow::config::BehaviorConfig;
use keyflow::event::KeyPos;
use keyflow::overlay::{OVERLAY_MAX_BINDINGS, OVERLAY_MAX_NUM, OverlayAction, OverlayMap};
use keyflow::tap_dance::{TAP_DANCE_MAX_NUM, TapDance};
use keyflow_types::action::{Action, KeyAction};

use crate::error::{ConfigError, ConfigResult};
use crate::layout::{Names, parse_key_action};
use crate::{KeyboardTomlConfig, LayerRef};

impl KeyboardTomlConfig {
    /// Convert the `[behavior]` and `[[overlay]]` sections to the runtime behavior config
    pub fn get_behavior_config<const ROW: usize, const COL: usize>(&self, names: &Names) -> ConfigResult<BehaviorConfig> {
        let behavior = &self.behavior;
        let mut config = BehaviorConfig::default();

        if let Some(tri_layer) = &behavior.tri_layer {
            config.tri_layer = Some([
                resolve_layer(&tri_layer.lower, names)?,
                resolve_layer(&tri_layer.upper, names)?,
                resolve_layer(&tri_layer.adjust, names)?,
            ]);
        }

        let tap_hold = &behavior.tap_hold;
        if let Some(term) = &tap_hold.tapping_term {
            config.tap_hold.tapping_term = term.into();
        }
        config.tap_hold.interrupt_policy = tap_hold.interrupt_policy.into();
        config.tap_hold.tapping_toggle = tap_hold.tapping_toggle;

        if let Some(timeout) = behavior.one_shot.as_ref().and_then(|o| o.timeout.as_ref()) {
            config.one_shot.timeout = timeout.into();
        }

        for (i, tap_dance) in behavior.tap_dance.iter().enumerate() {
            let field = format!("behavior.tap_dance[{}]", i);
            let taps = tap_dance
                .taps
                .iter()
                .map(|tap| single_action(&field, tap, names))
                .collect::<ConfigResult<Vec<_>>>()?;
            let hold = match &tap_dance.hold {
                Some(hold) => single_action(&field, hold, names)?,
                None => Action::No,
            };
            if config.tap_dance.tap_dances.push(TapDance::new(&taps, hold)).is_err() {
                return Err(too_many(&field, TAP_DANCE_MAX_NUM));
            }
        }

        for (i, overlay) in self.overlay.iter().enumerate() {
            let field = format!("overlay[{}].keys", i);
            let grid = self.parse_grid::<ROW, COL>(&field, &overlay.keys, names)?;
            let mut map = OverlayMap::new();
            for (row, keys) in grid.iter().enumerate() {
                for (col, key) in keys.iter().enumerate() {
                    let overlay_action = match key {
                        KeyAction::Transparent => continue,
                        KeyAction::No => OverlayAction::Remap(Action::No),
                        KeyAction::Single(Action::ModeExit) => OverlayAction::Exit,
                        KeyAction::Single(action) if action.is_plain() => OverlayAction::Remap(*action),
                        _ => {
                            return Err(ConfigError::Validation {
                                field,
                                message: format!("({}, {}) must be a plain key or EXIT, got {:?}", row, col, key),
                            });
                        }
                    };
                    if map.bindings.len() == OVERLAY_MAX_BINDINGS {
                        return Err(too_many(&field, OVERLAY_MAX_BINDINGS));
                    }
                    map = map.bind(KeyPos::new(row as u8, col as u8), overlay_action);
                }
            }
            if config.overlay.overlays.push(map).is_err() {
                return Err(too_many("overlay", OVERLAY_MAX_NUM));
            }
        }

        Ok(config)
    }
}

fn resolve_layer(layer: &LayerRef, names: &Names) -> ConfigResult<u8> {
    match layer {
        LayerRef::Index(i) => Ok(*i),
        LayerRef::Name(name) => names
            .layers
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownLayer { name: name.clone() }),
    }
}

/// A tap dance entry is a single action, `_` does nothing
fn single_action(field: &str, key: &str, names: &Names) -> ConfigResult<Action> {
    match parse_key_action(key, names)? {
        KeyAction::Single(action) => Ok(action),
        KeyAction::Transparent => Ok(Action::Transparent),
        KeyAction::No => Ok(Action::No),
        other => Err(ConfigError::Validation {
            field: field.to_string(),
            message: format!("'{}' is {:?}, tap dance entries must be single actions", key, other),
        }),
    }
}

fn too_many(field: &str, max: usize) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: format!("at most {} entries are supported", max),
    }
}
