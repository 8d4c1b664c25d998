//! Integer grid primitives shared by layers and the streaming engine.

use crate::math::Vec2;

/// A cell of the global tiled grid.
///
/// Signed so that layer-local arithmetic (`world - offset`) can go negative
/// without wrapping.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WorldCell {
    pub row: i64,
    pub col: i64,
}

impl WorldCell {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

/// Row/column count of a grid. Zero in either axis means "unknown".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct GridExtent {
    pub rows: u32,
    pub cols: u32,
}

impl GridExtent {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn is_known(&self) -> bool {
        self.rows > 0 && self.cols > 0
    }

    pub fn contains(&self, row: i64, col: i64) -> bool {
        row >= 0 && col >= 0 && row < self.rows as i64 && col < self.cols as i64
    }
}

/// Pixel size of one tile in world space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f64, self.height as f64)
    }

    /// World-pixel position of the top-left corner of `cell`.
    pub fn origin_of(&self, cell: WorldCell) -> Vec2 {
        Vec2::new(
            cell.col as f64 * self.width as f64,
            cell.row as f64 * self.height as f64,
        )
    }
}

/// Inclusive rectangle of world cells.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CellRect {
    pub row_min: i64,
    pub row_max: i64,
    pub col_min: i64,
    pub col_max: i64,
}

impl CellRect {
    pub fn new(row_min: i64, row_max: i64, col_min: i64, col_max: i64) -> Self {
        Self {
            row_min,
            row_max,
            col_min,
            col_max,
        }
    }

    pub fn single(cell: WorldCell) -> Self {
        Self::new(cell.row, cell.row, cell.col, cell.col)
    }

    pub fn is_empty(&self) -> bool {
        self.row_min > self.row_max || self.col_min > self.col_max
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        ((self.row_max - self.row_min + 1) * (self.col_max - self.col_min + 1)) as usize
    }

    /// Clamp each bound independently into `extent`.
    ///
    /// The result always lies inside the extent, even when `self` lies
    /// completely outside of it (it collapses onto the nearest edge). An
    /// unknown extent leaves the rectangle unchanged.
    pub fn clamp_to(&self, extent: GridExtent) -> Self {
        if !extent.is_known() {
            return *self;
        }
        let max_row = extent.rows as i64 - 1;
        let max_col = extent.cols as i64 - 1;
        Self::new(
            self.row_min.clamp(0, max_row),
            self.row_max.clamp(0, max_row),
            self.col_min.clamp(0, max_col),
            self.col_max.clamp(0, max_col),
        )
    }

    /// Row-major iteration over the cells.
    pub fn cells(&self) -> impl Iterator<Item = WorldCell> + '_ {
        let cols = self.col_min..=self.col_max;
        (self.row_min..=self.row_max)
            .flat_map(move |row| cols.clone().map(move |col| WorldCell::new(row, col)))
    }
}
