use foundation::{Aabb2, CellRect, GridExtent, ScreenRect, TileSize, Vec2, WorldCell};

pub const MIN_SCALE: f64 = 0.01;
pub const MAX_SCALE: f64 = 12.0;

/// Exponential zoom rate per unit of wheel delta.
pub const WHEEL_ZOOM_RATE: f64 = 0.0015;

/// Extra pixels added to drawn tiles to hide seams between neighbors.
pub const TILE_OVERDRAW_PX: i64 = 1;

pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Maps world pixels to screen pixels: `screen = world * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    scale: f64,
    offset: Vec2,
    viewport: Vec2,
    zoom_rate: f64,
}

impl ViewTransform {
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
            viewport: clamp_viewport(viewport_width, viewport_height),
            zoom_rate: WHEEL_ZOOM_RATE,
        }
    }

    pub fn with_zoom_rate(mut self, zoom_rate: f64) -> Self {
        self.zoom_rate = zoom_rate;
        self
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Sets scale (clamped) and offset directly.
    pub fn set(&mut self, scale: f64, offset: Vec2) {
        self.scale = clamp_scale(scale);
        self.offset = offset;
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world * self.scale + self.offset
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.offset) / self.scale
    }

    pub fn pan(&mut self, screen_delta: Vec2) {
        self.offset += screen_delta;
    }

    /// Zooms around `cursor` so the world point under it stays put.
    ///
    /// Positive deltas zoom out, negative deltas zoom in.
    pub fn zoom_at(&mut self, cursor: Vec2, wheel_delta: f64) {
        let before = self.screen_to_world(cursor);
        self.scale = clamp_scale(self.scale * (-wheel_delta * self.zoom_rate).exp());
        self.offset += cursor - self.world_to_screen(before);
    }

    /// Viewport dimensions are raised to at least one pixel.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = clamp_viewport(width, height);
    }

    /// Scale that fits `tiles_x` by `tiles_y` tiles in the viewport, with the
    /// world origin placed at `origin` on screen.
    pub fn reset_to_start(&mut self, tile: TileSize, tiles_x: f64, tiles_y: f64, origin: Vec2) {
        self.scale = if tile.is_valid() {
            let fit_x = self.viewport.x / (tiles_x * tile.width as f64);
            let fit_y = self.viewport.y / (tiles_y * tile.height as f64);
            clamp_scale(fit_x.min(fit_y))
        } else {
            1.0
        };
        self.offset = origin;
    }

    /// World point under the viewport center.
    pub fn center_world(&self) -> Vec2 {
        self.screen_to_world(self.viewport / 2.0)
    }

    /// Viewport center in fractional tile units (`x` = column, `y` = row).
    pub fn center_in_tiles(&self, tile: TileSize) -> Vec2 {
        self.center_world().div_components(tile.as_vec2())
    }

    /// Cells covered by the viewport, grown by `margin` on every side and
    /// clamped to `extent`.
    ///
    /// An unknown extent yields the single cell `(0, 0)`.
    pub fn visible_cells(&self, extent: GridExtent, tile: TileSize, margin: i64) -> CellRect {
        if !extent.is_known() || !tile.is_valid() {
            return CellRect::single(WorldCell::default());
        }

        let corners = [
            Vec2::ZERO,
            Vec2::new(self.viewport.x, 0.0),
            Vec2::new(0.0, self.viewport.y),
            self.viewport,
        ]
        .map(|corner| self.screen_to_world(corner));
        let Some(bounds) = Aabb2::from_points(corners) else {
            return CellRect::single(WorldCell::default());
        };

        // `as` saturates for out-of-range floats, so the margin must too.
        let tile = tile.as_vec2();
        let cell_of = |world: f64, size: f64| (world / size).floor() as i64;
        CellRect::new(
            cell_of(bounds.min.y, tile.y).saturating_sub(margin),
            cell_of(bounds.max.y, tile.y).saturating_add(margin),
            cell_of(bounds.min.x, tile.x).saturating_sub(margin),
            cell_of(bounds.max.x, tile.x).saturating_add(margin),
        )
        .clamp_to(extent)
    }

    /// Screen rectangle for `cell`, snapped to whole pixels and grown by
    /// `overdraw` pixels in width and height.
    pub fn tile_dest_rect(&self, cell: WorldCell, tile: TileSize, overdraw: i64) -> ScreenRect {
        let origin = self.world_to_screen(tile.origin_of(cell));
        let size = tile.as_vec2() * self.scale;
        ScreenRect::new(
            origin.x.round() as i64,
            origin.y.round() as i64,
            size.x.round() as i64 + overdraw,
            size.y.round() as i64 + overdraw,
        )
    }
}

fn clamp_viewport(width: f64, height: f64) -> Vec2 {
    let side = |v: f64| if v.is_finite() { v.max(1.0) } else { 1.0 };
    Vec2::new(side(width), side(height))
}
