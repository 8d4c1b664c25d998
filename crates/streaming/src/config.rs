use foundation::{GridExtent, TileSize, Vec2};
use layers::{DEFAULT_ASSET_EXTENSION, LayerDescriptor, LayerRegistry};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_EVICTION_FRACTION;
use crate::error::ConfigError;
use crate::fetch::BoxFuture;
use crate::queue::DEFAULT_MAX_INFLIGHT;
use crate::view::WHEEL_ZOOM_RATE;

/// `world.tile` in the configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSizeFile {
    #[serde(default)]
    pub w: u32,
    #[serde(default)]
    pub h: u32,
}

/// `world` in the configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldFile {
    #[serde(default)]
    pub rows: u32,
    #[serde(default)]
    pub cols: u32,
    #[serde(default)]
    pub tile: Option<TileSizeFile>,
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfigFile {
    #[serde(default)]
    pub world: WorldFile,
    #[serde(default)]
    pub maps: Vec<LayerDescriptor>,
}

/// Validated world configuration: extent, tile size and the layer set.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    /// May be `0 x 0` when the server does not know the world size.
    pub extent: GridExtent,
    pub tile_size: TileSize,
    pub registry: LayerRegistry,
}

impl WorldConfig {
    pub fn from_file(file: WorldConfigFile) -> Result<Self, ConfigError> {
        let tile = file.world.tile.unwrap_or_default();
        let tile_size = TileSize::new(tile.w, tile.h);
        if !tile_size.is_valid() {
            return Err(ConfigError::MissingTileSize {
                width: tile.w,
                height: tile.h,
            });
        }

        Ok(Self {
            extent: GridExtent::new(file.world.rows, file.world.cols),
            tile_size,
            registry: LayerRegistry::from_descriptors(file.maps)?,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_file(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        Self::from_file(serde_json::from_slice(bytes)?)
    }
}

/// Supplies the world configuration at startup.
pub trait ConfigSource: Send + Sync {
    fn fetch_world_config(&self) -> BoxFuture<'_, Result<WorldConfig, ConfigError>>;
}

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache_capacity: usize,
    pub eviction_fraction: f64,
    pub max_inflight: usize,
    pub load_budget_per_frame: u32,
    /// Extra cells requested around the viewport on every side.
    pub visible_margin: i64,
    pub asset_extension: String,
    pub wheel_zoom_rate: f64,
    /// Tiles that fit across and down the viewport in the start view.
    pub start_tiles_x: f64,
    pub start_tiles_y: f64,
    /// Screen position of the world origin in the start view.
    pub start_offset_x: f64,
    pub start_offset_y: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 800,
            eviction_fraction: DEFAULT_EVICTION_FRACTION,
            max_inflight: DEFAULT_MAX_INFLIGHT,
            load_budget_per_frame: 18,
            visible_margin: 1,
            asset_extension: DEFAULT_ASSET_EXTENSION.to_string(),
            wheel_zoom_rate: WHEEL_ZOOM_RATE,
            start_tiles_x: 3.0,
            start_tiles_y: 2.0,
            start_offset_x: 20.0,
            start_offset_y: 20.0,
        }
    }
}

impl EngineConfig {
    pub fn start_offset(&self) -> Vec2 {
        Vec2::new(self.start_offset_x, self.start_offset_y)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::InvalidSetting {
                name,
                reason: reason.into(),
            }
        }

        if self.cache_capacity == 0 {
            return Err(invalid("cache_capacity", "must be at least 1"));
        }
        if !(self.eviction_fraction > 0.0 && self.eviction_fraction <= 1.0) {
            return Err(invalid(
                "eviction_fraction",
                format!("{} is not in (0, 1]", self.eviction_fraction),
            ));
        }
        if self.max_inflight == 0 {
            return Err(invalid("max_inflight", "must be at least 1"));
        }
        if self.visible_margin < 0 {
            return Err(invalid("visible_margin", "must not be negative"));
        }
        if self.asset_extension.is_empty() || self.asset_extension.starts_with('.') {
            return Err(invalid(
                "asset_extension",
                "must be a bare extension such as \"webp\"",
            ));
        }
        if !(self.wheel_zoom_rate.is_finite() && self.wheel_zoom_rate > 0.0) {
            return Err(invalid("wheel_zoom_rate", "must be positive"));
        }
        if !(self.start_tiles_x > 0.0 && self.start_tiles_y > 0.0) {
            return Err(invalid("start_tiles", "must be positive"));
        }
        if !self.start_offset().is_finite() {
            return Err(invalid("start_offset", "must be finite"));
        }
        Ok(())
    }
}
