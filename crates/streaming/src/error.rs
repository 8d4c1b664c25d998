use layers::RegistryError;
use thiserror::Error;

/// World configuration is missing or invalid. Fatal: the engine does not start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("world tile size missing or zero (got {width}x{height})")]
    MissingTileSize { width: u32, height: u32 },

    #[error("invalid world configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Layers(#[from] RegistryError),

    #[error("engine setting {name} is out of range: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("could not fetch world configuration: {0}")]
    Unavailable(String),
}

/// A single tile asset failed to load.
///
/// Transport and decode failures are not distinguished.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("asset load failed: {message}")]
pub struct AssetLoadError {
    pub message: String,
}

impl AssetLoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
