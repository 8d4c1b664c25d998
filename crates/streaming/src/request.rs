use std::fmt;

use layers::LayerId;

/// Identifies one tile asset across layers: `layer_id/asset_key`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    pub layer_id: LayerId,
    pub asset_key: String,
}

impl CacheKey {
    pub fn new(layer_id: LayerId, asset_key: impl Into<String>) -> Self {
        Self {
            layer_id,
            asset_key: asset_key.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layer_id, self.asset_key)
    }
}

/// One fetch to perform through the asset collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadJob {
    pub layer_id: LayerId,
    pub asset_key: String,
    pub cache_key: CacheKey,
}

impl LoadJob {
    pub fn new(layer_id: LayerId, asset_key: impl Into<String>) -> Self {
        let asset_key = asset_key.into();
        Self {
            cache_key: CacheKey::new(layer_id.clone(), asset_key.clone()),
            layer_id,
            asset_key,
        }
    }
}
