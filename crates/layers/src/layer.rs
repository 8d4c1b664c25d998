use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use foundation::{GridExtent, WorldCell};

/// Maximum rows of a layer grid: local rows are addressed by a single letter.
pub const MAX_LAYER_ROWS: u32 = 26;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a cell inside a layer's own grid: row letter + 1-based column,
/// e.g. local row 0 col 0 is `A1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalKey(String);

impl LocalKey {
    /// `None` when `row` has no letter (`row >= 26`).
    pub fn from_local(row: u32, col: u32) -> Option<Self> {
        if row >= MAX_LAYER_ROWS {
            return None;
        }
        let letter = char::from(b'A' + row as u8);
        Some(Self(format!("{letter}{}", col as u64 + 1)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LocalKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LocalKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for LocalKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type KeySet = HashSet<LocalKey>;

/// Which local cells a layer serves, before exclusions are applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InclusionMode {
    /// Every cell of the local grid.
    #[default]
    Auto,
    /// Only the listed keys (plus the layer's overrides).
    Whitelist(KeySet),
}

/// One overlay source of tiles. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub label: String,
    /// Higher wins when several layers cover the same world cell.
    pub z: i32,
    /// World cell of this layer's local origin.
    pub offset: WorldCell,
    pub grid: GridExtent,
    pub inclusion: InclusionMode,
    /// Always rejected, whatever the inclusion mode or overrides say.
    pub excludes: KeySet,
    /// Accepted even when missing from a whitelist; never beats `excludes`.
    pub overrides: KeySet,
}

impl Layer {
    /// An `Auto` layer with no key rules.
    pub fn new(id: impl Into<String>, z: i32, offset: WorldCell, grid: GridExtent) -> Self {
        let id = LayerId::new(id);
        Self {
            label: id.0.clone(),
            id,
            z,
            offset,
            grid,
            inclusion: InclusionMode::Auto,
            excludes: KeySet::new(),
            overrides: KeySet::new(),
        }
    }

    /// Local coordinates of `cell`, if it falls inside this layer's grid.
    pub fn local_cell(&self, cell: WorldCell) -> Option<(u32, u32)> {
        let row = cell.row - self.offset.row;
        let col = cell.col - self.offset.col;
        if !self.grid.contains(row, col) {
            return None;
        }
        Some((row as u32, col as u32))
    }

    pub fn local_key(&self, cell: WorldCell) -> Option<LocalKey> {
        let (row, col) = self.local_cell(cell)?;
        LocalKey::from_local(row, col)
    }

    /// Key rules only: exclusion first, then whitelist/override.
    pub fn accepts(&self, key: &LocalKey) -> bool {
        if self.excludes.contains(key) {
            return false;
        }
        match &self.inclusion {
            InclusionMode::Auto => true,
            InclusionMode::Whitelist(allowed) => {
                allowed.contains(key) || self.overrides.contains(key)
            }
        }
    }

    /// Every key this layer could ever serve, sorted for stable ordering.
    ///
    /// Whitelist layers yield their whitelist minus exclusions; `Auto` layers
    /// walk the full local grid minus exclusions.
    pub fn servable_keys(&self) -> Vec<LocalKey> {
        let mut keys: Vec<LocalKey> = match &self.inclusion {
            InclusionMode::Whitelist(allowed) => allowed
                .iter()
                .filter(|k| !self.excludes.contains(*k))
                .cloned()
                .collect(),
            InclusionMode::Auto => (0..self.grid.rows)
                .flat_map(|row| {
                    (0..self.grid.cols).filter_map(move |col| LocalKey::from_local(row, col))
                })
                .filter(|k| !self.excludes.contains(k))
                .collect(),
        };
        if matches!(self.inclusion, InclusionMode::Whitelist(_)) {
            keys.sort();
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::{InclusionMode, KeySet, Layer, LocalKey};
    use foundation::{GridExtent, WorldCell};

    fn keys(list: &[&str]) -> KeySet {
        list.iter().map(|k| LocalKey::from(*k)).collect()
    }

    #[test]
    fn local_key_is_row_letter_then_one_based_column() {
        assert_eq!(LocalKey::from_local(0, 0).unwrap().as_str(), "A1");
        assert_eq!(LocalKey::from_local(1, 9).unwrap().as_str(), "B10");
        assert_eq!(LocalKey::from_local(25, 0).unwrap().as_str(), "Z1");
        assert!(LocalKey::from_local(26, 0).is_none());
    }

    #[test]
    fn local_cell_subtracts_offset() {
        let layer = Layer::new("m", 0, WorldCell::new(2, 3), GridExtent::new(2, 2));
        assert_eq!(layer.local_cell(WorldCell::new(2, 3)), Some((0, 0)));
        assert_eq!(layer.local_cell(WorldCell::new(3, 4)), Some((1, 1)));
        assert_eq!(layer.local_cell(WorldCell::new(1, 3)), None);
        assert_eq!(layer.local_cell(WorldCell::new(2, 5)), None);
        assert_eq!(layer.local_key(WorldCell::new(3, 3)).unwrap().as_str(), "B1");
    }

    #[test]
    fn exclusion_beats_whitelist_and_override() {
        let mut layer = Layer::new("m", 0, WorldCell::default(), GridExtent::new(2, 2));
        layer.inclusion = InclusionMode::Whitelist(keys(&["A1"]));
        layer.overrides = keys(&["A1", "B2"]);
        layer.excludes = keys(&["A1"]);

        assert!(!layer.accepts(&"A1".into()));
        assert!(layer.accepts(&"B2".into()));
        assert!(!layer.accepts(&"A2".into()));
    }

    #[test]
    fn servable_keys_respect_mode_and_exclusions() {
        let mut auto = Layer::new("a", 0, WorldCell::default(), GridExtent::new(2, 2));
        auto.excludes = keys(&["A2"]);
        let got: Vec<_> = auto.servable_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(got, vec!["A1", "B1", "B2"]);

        let mut listed = Layer::new("w", 0, WorldCell::default(), GridExtent::new(2, 2));
        listed.inclusion = InclusionMode::Whitelist(keys(&["B2", "A1", "B1"]));
        listed.excludes = keys(&["B1"]);
        let got: Vec<_> = listed.servable_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(got, vec!["A1", "B2"]);
    }
}
