// ============================================================================
// Error Types
// ============================================================================

use std::path::PathBuf;

/// Errors raised by the settings store
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unknown settings key: {0}")]
    UnknownKey(String),

    #[error("Type mismatch for key '{key}': expected {expected}, got {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Value {value} for key '{key}' is outside [{min}, {max}]")]
    OutOfRange {
        key: String,
        value: String,
        min: String,
        max: String,
    },
}

/// Errors raised by the idle dispatch queue
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to spawn idle worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors raised while loading a pipeline configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors raised by pipeline stages and the plugin host
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Failed to create a forward FFT plan of size {size}")]
    FftPlan { size: usize },

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Plugin index {0} out of bounds")]
    IndexOutOfRange(usize),
}

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;
