//! Raw layer descriptors as they appear in the world configuration JSON.
//!
//! Everything except `id` is optional; [`LayerDescriptor::normalize`] fills in
//! the defaults and produces an immutable [`Layer`].

use std::collections::BTreeMap;

use foundation::{GridExtent, WorldCell};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RegistryError;
use crate::layer::{InclusionMode, KeySet, Layer, LayerId, LocalKey, MAX_LAYER_ROWS};

/// Rows/cols used when a descriptor omits its grid (or gives zero).
pub const DEFAULT_LAYER_GRID: u32 = 26;

const AUTO_MODE: &str = "auto";

/// A set of local keys, either `{"A1": true, "B7": false}` or `["A1"]`.
///
/// In the object form a key is a member when its value is truthy: anything
/// except `false`, `null`, `0` and `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySetDescriptor {
    Flags(BTreeMap<String, Value>),
    List(Vec<String>),
}

impl KeySetDescriptor {
    pub fn into_key_set(self) -> KeySet {
        match self {
            KeySetDescriptor::Flags(flags) => flags
                .into_iter()
                .filter(|(_, flag)| is_truthy(flag))
                .map(|(k, _)| LocalKey::from(k))
                .collect(),
            KeySetDescriptor::List(list) => list.into_iter().map(LocalKey::from).collect(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(on) => *on,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `"auto"` or an explicit whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncludeDescriptor {
    Mode(String),
    Keys(KeySetDescriptor),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetDescriptor {
    #[serde(default)]
    pub row: i64,
    #[serde(default)]
    pub col: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDescriptor {
    #[serde(default)]
    pub rows: Option<u32>,
    #[serde(default)]
    pub cols: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub z: Option<i32>,
    #[serde(default)]
    pub offset: Option<OffsetDescriptor>,
    #[serde(default)]
    pub grid: Option<GridDescriptor>,
    #[serde(default)]
    pub include: Option<IncludeDescriptor>,
    #[serde(default)]
    pub excludes: Option<KeySetDescriptor>,
    #[serde(default)]
    pub overrides: Option<KeySetDescriptor>,
}

impl LayerDescriptor {
    pub fn normalize(self) -> Result<Layer, RegistryError> {
        let grid = self.grid.unwrap_or_default();
        let rows = grid.rows.filter(|r| *r > 0).unwrap_or(DEFAULT_LAYER_GRID);
        let cols = grid.cols.filter(|c| *c > 0).unwrap_or(DEFAULT_LAYER_GRID);
        if rows > MAX_LAYER_ROWS {
            return Err(RegistryError::GridTooTall {
                id: self.id,
                rows,
                max: MAX_LAYER_ROWS,
            });
        }

        let inclusion = match self.include {
            None => InclusionMode::Auto,
            Some(IncludeDescriptor::Mode(mode)) if mode == AUTO_MODE => InclusionMode::Auto,
            Some(IncludeDescriptor::Mode(mode)) => {
                return Err(RegistryError::UnknownInclusionMode { id: self.id, mode });
            }
            Some(IncludeDescriptor::Keys(keys)) => InclusionMode::Whitelist(keys.into_key_set()),
        };

        let offset = self.offset.unwrap_or_default();
        let label = self
            .label
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| self.id.clone());

        Ok(Layer {
            id: LayerId::new(self.id),
            label,
            z: self.z.unwrap_or(0),
            offset: WorldCell::new(offset.row, offset.col),
            grid: GridExtent::new(rows, cols),
            inclusion,
            excludes: self.excludes.map(KeySetDescriptor::into_key_set).unwrap_or_default(),
            overrides: self.overrides.map(KeySetDescriptor::into_key_set).unwrap_or_default(),
        })
    }
}
