//! Unified error types for keyflow-config

use std::fmt;

use keyflow::error::KeyflowError;

/// Unified error type for keyflow-config
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// File I/O error
    Io { path: String, message: String },
    /// TOML parsing error
    Toml { message: String },
    /// A key string or keymap doesn't follow the keymap grammar
    Parse { input: String, message: String },
    /// Keycode name not found, neither as a keycode nor as an alias
    UnknownKey { key: String },
    /// Layer or mode name not defined
    UnknownLayer { name: String },
    /// Validation error with context
    Validation { field: String, message: String },
    /// The config doesn't match the keymap size the firmware is built with
    Dimension {
        field: String,
        expected: usize,
        actual: usize,
    },
    /// The built keymap was rejected
    Keyflow(KeyflowError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "Failed to read config file '{}': {}", path, message)
            }
            ConfigError::Toml { message } => write!(f, "Failed to parse TOML: {}", message),
            ConfigError::Parse { input, message } => {
                write!(f, "Invalid key '{}': {}", input, message)
            }
            ConfigError::UnknownKey { key } => write!(f, "Unknown keycode: {}", key),
            ConfigError::UnknownLayer { name } => write!(f, "Unknown layer or mode name: {}", name),
            ConfigError::Validation { field, message } => {
                write!(f, "Validation error in '{}': {}", field, message)
            }
            ConfigError::Dimension {
                field,
                expected,
                actual,
            } => write!(f, "'{}' is {}, but the keymap is built for {}", field, actual, expected),
            ConfigError::Keyflow(e) => write!(f, "Invalid keymap: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Keyflow(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml { message: e.to_string() }
    }
}

impl From<KeyflowError> for ConfigError {
    fn from(e: KeyflowError) -> Self {
        ConfigError::Keyflow(e)
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
