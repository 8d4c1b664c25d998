use foundation::WorldCell;

use crate::layer::{LayerId, LocalKey};
use crate::registry::LayerRegistry;

/// Extension appended to local keys to form asset keys.
pub const DEFAULT_ASSET_EXTENSION: &str = "webp";

/// Which layer supplies a world cell, and under which asset key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub layer_id: LayerId,
    pub local_key: LocalKey,
    /// `local_key` plus the preferred extension, e.g. `A1.webp`.
    pub asset_key: String,
    pub z: i32,
}

/// Topmost-wins compositing over a [`LayerRegistry`].
#[derive(Debug, Clone)]
pub struct TileResolver {
    registry: LayerRegistry,
    extension: String,
}

impl TileResolver {
    pub fn new(registry: LayerRegistry, extension: impl Into<String>) -> Self {
        Self {
            registry,
            extension: extension.into(),
        }
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn asset_key(&self, key: &LocalKey) -> String {
        format!("{key}.{}", self.extension)
    }

    /// First layer in `z` order whose grid covers `cell` and whose key rules
    /// accept it. `None` means the cell is a gap in the world.
    pub fn resolve(&self, cell: WorldCell) -> Option<Resolution> {
        self.registry.iter().find_map(|layer| {
            let local_key = layer.local_key(cell)?;
            if !layer.accepts(&local_key) {
                return None;
            }
            Some(Resolution {
                layer_id: layer.id.clone(),
                asset_key: self.asset_key(&local_key),
                local_key,
                z: layer.z,
            })
        })
    }
}
