use std::collections::HashMap;
use std::str::FromStr;

use keyflow_types::action::{Action, KeyAction};
use keyflow_types::keycode::KeyCode;
use keyflow_types::modifier::ModifierCombination;
use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;

use crate::KeyboardTomlConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::keycode_alias::KEYCODE_ALIAS;

// Pest parser using the grammar file
#[derive(Parser)]
#[grammar = "keymap.pest"]
struct ConfigParser;

// Max alias resolution depth to prevent infinite loops
const MAX_ALIAS_RESOLUTION_DEPTH: usize = 10;

/// Names usable in place of layer and mode indices
#[derive(Clone, Debug, Default)]
pub struct Names {
    pub layers: HashMap<String, u8>,
    pub modes: HashMap<String, u8>,
}

impl KeyboardTomlConfig {
    /// Parse every `[[layer]]`, missing layers are transparent
    pub(crate) fn get_layers<const ROW: usize, const COL: usize, const NUM_LAYER: usize>(
        &self,
        names: &Names,
    ) -> ConfigResult<[[[KeyAction; COL]; ROW]; NUM_LAYER]> {
        let mut layers = [[[KeyAction::Transparent; COL]; ROW]; NUM_LAYER];
        for (layer_number, layer) in self.layer.iter().enumerate() {
            let field = format!("layer[{}].keys", layer_number);
            let keys = self.parse_grid::<ROW, COL>(&field, &layer.keys, names)?;
            layers[layer_number] = keys;
        }
        Ok(layers)
    }

    /// Parse a row-major grid of keys, with aliases resolved
    pub(crate) fn parse_grid<const ROW: usize, const COL: usize>(
        &self,
        field: &str,
        keys: &str,
        names: &Names,
    ) -> ConfigResult<[[KeyAction; COL]; ROW]> {
        let keys = alias_resolver(keys, &self.aliases)?;
        let actions = parse_key_map(&keys, names)?;
        if actions.len() != ROW * COL {
            return Err(ConfigError::Dimension {
                field: field.to_string(),
                expected: ROW * COL,
                actual: actions.len(),
            });
        }
        let mut grid = [[KeyAction::Transparent; COL]; ROW];
        for (i, action) in actions.into_iter().enumerate() {
            grid[i / COL][i % COL] = action;
        }
        Ok(grid)
    }
}

/// Replace every `@alias` by its value, aliases may refer to other aliases
pub fn alias_resolver(keys: &str, aliases: &HashMap<String, String>) -> ConfigResult<String> {
    let mut current = keys.to_string();
    for _ in 0..MAX_ALIAS_RESOLUTION_DEPTH {
        if !current.contains('@') {
            return Ok(current);
        }
        let mut next = String::with_capacity(current.len());
        let mut rest = current.as_str();
        while let Some(at) = rest.find('@') {
            next.push_str(&rest[..at]);
            let tail = &rest[at + 1..];
            let end = tail.find(|c: char| c.is_whitespace()).unwrap_or(tail.len());
            let alias = &tail[..end];
            match aliases.get(alias) {
                Some(value) => next.push_str(value),
                None => {
                    return Err(ConfigError::Parse {
                        input: format!("@{}", alias),
                        message: "undefined alias".to_string(),
                    });
                }
            }
            rest = &tail[end..];
        }
        next.push_str(rest);
        current = next;
    }
    Err(ConfigError::Parse {
        input: keys.to_string(),
        message: format!(
            "alias resolution exceeded maximum depth ({}), aliases may refer to each other",
            MAX_ALIAS_RESOLUTION_DEPTH
        ),
    })
}

/// Parse whitespace separated key actions
pub fn parse_key_map(keys: &str, names: &Names) -> ConfigResult<Vec<KeyAction>> {
    let pairs = ConfigParser::parse(Rule::key_map, keys).map_err(|e| parse_error(keys, e))?;
    let mut actions = Vec::new();
    for pair in pairs {
        for inner in pair.into_inner() {
            if inner.as_rule() != Rule::EOI {
                actions.push(key_action(inner, names)?);
            }
        }
    }
    Ok(actions)
}

/// Parse the key string at a single position
pub fn parse_key_action(key: &str, names: &Names) -> ConfigResult<KeyAction> {
    let pairs = ConfigParser::parse(Rule::single_action, key).map_err(|e| parse_error(key, e))?;
    for pair in pairs {
        for inner in pair.into_inner() {
            if inner.as_rule() != Rule::EOI {
                return key_action(inner, names);
            }
        }
    }
    Err(ConfigError::Parse {
        input: key.to_string(),
        message: "empty key".to_string(),
    })
}

/// Get the keycode of a key name, `KC_` prefix and aliases accepted
pub fn get_keycode_with_alias(key: &str) -> ConfigResult<KeyCode> {
    let lower = key.to_lowercase();
    let lower = lower.strip_prefix("kc_").unwrap_or(&lower);
    let name = KEYCODE_ALIAS.get(lower).copied().unwrap_or(lower);
    KeyCode::from_str(name).map_err(|_| ConfigError::UnknownKey { key: key.to_string() })
}

fn parse_error(input: &str, e: pest::error::Error<Rule>) -> ConfigError {
    ConfigError::Parse {
        input: input.to_string(),
        message: e.to_string(),
    }
}

fn next_inner<'a>(pairs: &mut Pairs<'a, Rule>, outer: &str) -> ConfigResult<Pair<'a, Rule>> {
    pairs.next().ok_or_else(|| ConfigError::Parse {
        input: outer.to_string(),
        message: "missing argument".to_string(),
    })
}

fn key_action(pair: Pair<Rule>, names: &Names) -> ConfigResult<KeyAction> {
    let rule = pair.as_rule();
    let input = pair.as_str().to_string();
    let mut args = pair.into_inner();

    let action = match rule {
        Rule::transparent_action => KeyAction::Transparent,
        Rule::no_action => KeyAction::No,
        Rule::exit_action => KeyAction::Single(Action::ModeExit),
        Rule::simple_keycode => {
            let code = get_keycode_with_alias(next_inner(&mut args, &input)?.as_str())?;
            KeyAction::Single(Action::Key(code))
        }
        Rule::mo_action => KeyAction::Single(Action::LayerOn(layer_ref(next_inner(&mut args, &input)?, &names.layers)?)),
        Rule::tg_action => {
            KeyAction::Single(Action::LayerToggle(layer_ref(next_inner(&mut args, &input)?, &names.layers)?))
        }
        Rule::osl_action => {
            KeyAction::Single(Action::OneShotLayer(layer_ref(next_inner(&mut args, &input)?, &names.layers)?))
        }
        Rule::df_action => {
            KeyAction::Single(Action::DefaultLayer(layer_ref(next_inner(&mut args, &input)?, &names.layers)?))
        }
        Rule::off_action => {
            KeyAction::Single(Action::LayerOff(layer_ref(next_inner(&mut args, &input)?, &names.layers)?))
        }
        Rule::tt_action => KeyAction::LayerTapToggle(layer_ref(next_inner(&mut args, &input)?, &names.layers)?),
        Rule::mode_action => {
            KeyAction::Single(Action::ModeToggle(layer_ref(next_inner(&mut args, &input)?, &names.modes)?))
        }
        Rule::lt_action => {
            let layer = layer_ref(next_inner(&mut args, &input)?, &names.layers)?;
            let code = get_keycode_with_alias(next_inner(&mut args, &input)?.as_str())?;
            KeyAction::TapHold(Action::Key(code), Action::LayerOn(layer))
        }
        Rule::mt_action => {
            let code = get_keycode_with_alias(next_inner(&mut args, &input)?.as_str())?;
            let modifiers = modifiers(next_inner(&mut args, &input)?)?;
            KeyAction::TapHold(Action::Key(code), Action::Modifier(modifiers))
        }
        Rule::th_action => {
            let tap = get_keycode_with_alias(next_inner(&mut args, &input)?.as_str())?;
            let hold = get_keycode_with_alias(next_inner(&mut args, &input)?.as_str())?;
            KeyAction::TapHold(Action::Key(tap), Action::Key(hold))
        }
        Rule::wm_action => {
            let code = get_keycode_with_alias(next_inner(&mut args, &input)?.as_str())?;
            let modifiers = modifiers(next_inner(&mut args, &input)?)?;
            KeyAction::Single(Action::KeyWithModifier(code, modifiers))
        }
        Rule::td_action => KeyAction::TapDance(number(next_inner(&mut args, &input)?)?),
        Rule::modified_action => {
            let (code, modifiers) = modified_key(&input, args)?;
            KeyAction::Single(Action::KeyWithModifier(code, modifiers))
        }
        _ => {
            return Err(ConfigError::Parse {
                input,
                message: format!("unexpected rule {:?}", rule),
            });
        }
    };
    Ok(action)
}

fn number(pair: Pair<Rule>) -> ConfigResult<u8> {
    pair.as_str().parse().map_err(|_| ConfigError::Parse {
        input: pair.as_str().to_string(),
        message: "number must be between 0 and 255".to_string(),
    })
}

fn layer_ref(pair: Pair<Rule>, names: &HashMap<String, u8>) -> ConfigResult<u8> {
    match pair.as_rule() {
        Rule::number => number(pair),
        _ => names
            .get(pair.as_str())
            .copied()
            .ok_or_else(|| ConfigError::UnknownLayer {
                name: pair.as_str().to_string(),
            }),
    }
}

/// Get modifier combination, in types of mod1 | mod2 | ...
fn modifiers(pair: Pair<Rule>) -> ConfigResult<ModifierCombination> {
    let mut combination = ModifierCombination::new();
    for key in pair.into_inner() {
        let code = get_keycode_with_alias(key.as_str())?;
        if !code.is_modifier() {
            return Err(ConfigError::Parse {
                input: key.as_str().to_string(),
                message: "not a modifier".to_string(),
            });
        }
        combination = combination | code.to_modifier();
    }
    Ok(combination)
}

/// `LCTL(LALT(Right))`: the key with every wrapping modifier
fn modified_key(input: &str, mut args: Pairs<Rule>) -> ConfigResult<(KeyCode, ModifierCombination)> {
    let modifier = match next_inner(&mut args, input)?.as_str().to_uppercase().as_str() {
        "LCTL" => ModifierCombination::LCTRL,
        "LSFT" => ModifierCombination::LSHIFT,
        "LALT" => ModifierCombination::LALT,
        "LGUI" => ModifierCombination::LGUI,
        "RCTL" => ModifierCombination::RCTRL,
        "RSFT" => ModifierCombination::RSHIFT,
        "RALT" => ModifierCombination::RALT,
        _ => ModifierCombination::RGUI,
    };
    let arg = next_inner(&mut args, input)?;
    let (code, inner) = match arg.as_rule() {
        Rule::modified_action => modified_key(arg.as_str(), arg.into_inner())?,
        _ => (get_keycode_with_alias(arg.as_str())?, ModifierCombination::new()),
    };
    Ok((code, inner | modifier))
}
