//! Load a keyflow keymap and its behavior config from a TOML keyboard file.
//!
//! ```toml
//! [layout]
//! rows = 1
//! cols = 3
//! layers = 2
//!
//! [[layer]]
//! name = "base"
//! keys = "A LT(lower, Esc) TD(0)"
//!
//! [[layer]]
//! name = "lower"
//! keys = "LALT(Right) _ _"
//!
//! [[behavior.tap_dance]]
//! taps = ["VOLU", "F3"]
//! ```

use std::collections::HashMap;
use std::path::Path;

use keyflow::keyboard::Keyboard;
use keyflow::keymap::KeyMap;
use serde::de;
use serde_derive::Deserialize;
use serde_inline_default::serde_inline_default;

pub mod behavior;
pub mod error;
pub mod keycode_alias;
pub mod layout;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use keycode_alias::KEYCODE_ALIAS;

/// A keyboard file
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyboardTomlConfig {
    pub layout: LayoutConfig,
    /// Aliases for key maps, `@name` in a keymap is replaced by the value
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// Layers of key maps, the first one is the default layer
    #[serde(default)]
    pub layer: Vec<LayerTomlConfig>,
    #[serde(default)]
    pub behavior: BehaviorTomlConfig,
    /// Mode overlays, `MODE(n)` enters `overlay[n]`
    #[serde(default)]
    pub overlay: Vec<OverlayTomlConfig>,
}

/// Configurations for keyboard layout
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    pub rows: u8,
    pub cols: u8,
    pub layers: u8,
}

/// A layer: `rows * cols` whitespace separated keys, row by row.
///
/// Layers missing at the end are fully transparent.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerTomlConfig {
    pub name: Option<String>,
    pub keys: String,
}

/// A mode overlay, laid out like a layer.
///
/// Transparent keys are left to the layers, `EXIT` leaves the mode, every
/// other key must be a plain key.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayTomlConfig {
    pub name: Option<String>,
    pub keys: String,
}

/// Configurations for actions behavior
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorTomlConfig {
    pub tri_layer: Option<TriLayerConfig>,
    #[serde(default)]
    pub tap_hold: TapHoldConfig,
    pub one_shot: Option<OneShotConfig>,
    #[serde(default)]
    pub tap_dance: Vec<TapDanceConfig>,
}

/// A layer given by its index or by its name
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LayerRef {
    Index(u8),
    Name(String),
}

/// Configurations for tri layer
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriLayerConfig {
    pub lower: LayerRef,
    pub upper: LayerRef,
    pub adjust: LayerRef,
}

/// Reaction of a pending tap-hold key to other key presses
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterruptPolicy {
    #[default]
    Ignore,
    PermissiveHold,
    HoldOnOtherPress,
}

impl From<InterruptPolicy> for keyflow::config::InterruptPolicy {
    fn from(policy: InterruptPolicy) -> Self {
        match policy {
            InterruptPolicy::Ignore => Self::Ignore,
            InterruptPolicy::PermissiveHold => Self::PermissiveHold,
            InterruptPolicy::HoldOnOtherPress => Self::HoldOnOtherPress,
        }
    }
}

/// Configurations for tap hold, shared by tap dance and tap toggle keys
#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TapHoldConfig {
    pub tapping_term: Option<DurationMillis>,
    #[serde(default)]
    pub interrupt_policy: InterruptPolicy,
    /// Taps needed by `TT(layer)` to toggle the layer
    #[serde_inline_default(3)]
    pub tapping_toggle: u8,
}

/// This separate Default impl is needed when `[behavior.tap_hold]` is not set
impl Default for TapHoldConfig {
    fn default() -> Self {
        Self {
            tapping_term: None,
            interrupt_policy: InterruptPolicy::Ignore,
            tapping_toggle: 3,
        }
    }
}

/// Configurations for one shot
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OneShotConfig {
    pub timeout: Option<DurationMillis>,
}

/// Configurations for tap dance
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TapDanceConfig {
    /// Action of the n-th tap, `_` for nothing
    pub taps: Vec<String>,
    pub hold: Option<String>,
}

/// Duration in milliseconds
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct DurationMillis(#[serde(deserialize_with = "parse_duration_millis")] pub u64);

impl From<&DurationMillis> for embassy_time::Duration {
    fn from(d: &DurationMillis) -> Self {
        embassy_time::Duration::from_millis(d.0)
    }
}

fn parse_duration_millis<'de, D: de::Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let input: String = de::Deserialize::deserialize(deserializer)?;
    let input = input.trim();
    let split = input.find(|c: char| !c.is_ascii_digit()).unwrap_or(input.len());
    let (num, unit) = input.split_at(split);
    let num: u64 = num
        .parse()
        .map_err(|_| de::Error::custom(format!("Invalid duration \"{input}\": number part must be a u64")))?;

    match unit.trim() {
        "s" => Ok(num * 1000),
        "ms" => Ok(num),
        other => Err(de::Error::custom(format!(
            "Invalid duration unit \"{other}\": unit part must be either \"s\" or \"ms\""
        ))),
    }
}

impl KeyboardTomlConfig {
    /// Read and parse a keyboard file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        content.parse()
    }

    /// Build the keymap, with the layers and the behavior config of this file.
    ///
    /// The sizes must match the ones the firmware is built with.
    pub fn build_keymap<const ROW: usize, const COL: usize, const NUM_LAYER: usize>(
        &self,
    ) -> ConfigResult<KeyMap<ROW, COL, NUM_LAYER>> {
        validation::validate_config(self)?;
        check_dimension("layout.rows", ROW, self.layout.rows)?;
        check_dimension("layout.cols", COL, self.layout.cols)?;
        check_dimension("layout.layers", NUM_LAYER, self.layout.layers)?;

        let names = self.names();
        let layers = self.get_layers::<ROW, COL, NUM_LAYER>(&names)?;
        let behavior = self.get_behavior_config::<ROW, COL>(&names)?;
        Ok(KeyMap::new(layers, behavior)?)
    }

    /// Build a keyboard ready to process events
    pub fn build_keyboard<const ROW: usize, const COL: usize, const NUM_LAYER: usize>(
        &self,
    ) -> ConfigResult<Keyboard<ROW, COL, NUM_LAYER>> {
        Ok(Keyboard::new(self.build_keymap()?))
    }

    /// Layer and mode names, to be used in place of indices
    pub fn names(&self) -> layout::Names {
        let mut names = layout::Names::default();
        for (i, layer) in self.layer.iter().enumerate() {
            if let Some(name) = &layer.name {
                names.layers.insert(name.clone(), i as u8);
            }
        }
        for (i, overlay) in self.overlay.iter().enumerate() {
            if let Some(name) = &overlay.name {
                names.modes.insert(name.clone(), i as u8);
            }
        }
        names
    }
}

impl std::str::FromStr for KeyboardTomlConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }
}

fn check_dimension(field: &str, expected: usize, actual: u8) -> ConfigResult<()> {
    if expected != actual as usize {
        return Err(ConfigError::Dimension {
            field: field.to_string(),
            expected,
            actual: actual as usize,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Timeouts {
        a: DurationMillis,
        b: DurationMillis,
    }

    #[test]
    fn test_parse_duration() {
        let t: Timeouts = toml::from_str("a = \"245ms\"\nb = \"1s\"").unwrap();
        assert_eq!(t.a, DurationMillis(245));
        assert_eq!(t.b, DurationMillis(1000));
        assert!(toml::from_str::<Timeouts>("a = \"245\"\nb = \"1s\"").is_err());
        assert!(toml::from_str::<Timeouts>("a = \"ms\"\nb = \"1s\"").is_err());
    }

    #[test]
    fn test_defaults() {
        let config: KeyboardTomlConfig = "[layout]\nrows = 1\ncols = 1\nlayers = 1\n".parse().unwrap();
        assert!(config.layer.is_empty());
        assert_eq!(config.behavior.tap_hold.tapping_toggle, 3);
        assert_eq!(config.behavior.tap_hold.interrupt_policy, InterruptPolicy::Ignore);
        assert!(config.behavior.tap_hold.tapping_term.is_none());
    }

    #[test]
    fn test_tap_hold_section() {
        let config: KeyboardTomlConfig = r#"
            [layout]
            rows = 1
            cols = 1
            layers = 1

            [behavior.tap_hold]
            tapping_term = "200ms"
            interrupt_policy = "permissive_hold"
        "#
        .parse()
        .unwrap();
        let tap_hold = &config.behavior.tap_hold;
        assert_eq!(tap_hold.tapping_term, Some(DurationMillis(200)));
        assert_eq!(tap_hold.interrupt_policy, InterruptPolicy::PermissiveHold);
        assert_eq!(tap_hold.tapping_toggle, 3);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = "[layout]\nrows = 1\ncols = 1\nlayers = 1\nsize = 3\n".parse::<KeyboardTomlConfig>();
        assert!(matches!(result, Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn test_dimension_mismatch() {
        let config: KeyboardTomlConfig = "[layout]\nrows = 1\ncols = 2\nlayers = 1\n".parse().unwrap();
        assert!(matches!(
            config.build_keymap::<1, 3, 1>(),
            Err(ConfigError::Dimension { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            KeyboardTomlConfig::load("/nonexistent/keyboard.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
