use std::collections::HashSet;

use crate::descriptor::LayerDescriptor;
use crate::error::RegistryError;
use crate::layer::{Layer, LayerId};

/// Normalized layer set, sorted by `z` descending.
///
/// Layers with equal `z` keep their configuration order, so resolution order
/// is fully determined by the input. The registry is never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
}

impl LayerRegistry {
    pub fn new(mut layers: Vec<Layer>) -> Result<Self, RegistryError> {
        if layers.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for layer in &layers {
            if !seen.insert(layer.id.as_str()) {
                return Err(RegistryError::DuplicateId(layer.id.0.clone()));
            }
        }

        // Stable sort: ties keep configuration order.
        layers.sort_by(|a, b| b.z.cmp(&a.z));
        Ok(Self { layers })
    }

    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = LayerDescriptor>,
    ) -> Result<Self, RegistryError> {
        let layers = descriptors
            .into_iter()
            .map(LayerDescriptor::normalize)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(layers)
    }

    /// Layers in resolution order (highest `z` first).
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }
}
