use std::fmt;
use std::mem;

use foundation::{GridExtent, ScreenRect, TileSize, Vec2, WorldCell};
use layers::{LayerId, LocalKey, Resolution, TileResolver};
use runtime::{Frame, FrameBudget, RedrawGate};
use tracing::{debug, info};

use crate::cache::TileCache;
use crate::config::{EngineConfig, WorldConfig};
use crate::error::{AssetLoadError, ConfigError};
use crate::priority::order_by_center_distance;
use crate::queue::{LoadQueue, QueueCounters};
use crate::request::{CacheKey, LoadJob};
use crate::residency::AssetState;
use crate::view::{TILE_OVERDRAW_PX, ViewTransform};

/// One thing for the renderer to paint.
#[derive(Debug, Clone, PartialEq)]
pub enum TileDraw<A> {
    /// A loaded asset stretched over `dest`.
    Tile {
        cell: WorldCell,
        layer_id: LayerId,
        asset: A,
        dest: ScreenRect,
    },
    /// A faint rectangle where an asset is still in flight.
    Placeholder { cell: WorldCell, dest: ScreenRect },
}

/// Per-frame counters, rendered as the HUD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub world: GridExtent,
    pub tile: TileSize,
    pub scale: f64,
    pub visible: usize,
    pub resolved: usize,
    pub drawn: usize,
    pub pending: usize,
    pub missing: usize,
    pub empty: usize,
    pub inflight: usize,
    pub max_inflight: usize,
    pub queued: usize,
    pub cache_len: usize,
    pub cache_capacity: usize,
    pub center: Vec2,
    pub fetches: QueueCounters,
    pub evicted: u64,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "world {}x{}", self.world.rows, self.world.cols)?;
        writeln!(f, "tile {}x{}", self.tile.width, self.tile.height)?;
        writeln!(f, "scale {:.5}", self.scale)?;
        writeln!(f, "visible {} | resolved {}", self.visible, self.resolved)?;
        writeln!(
            f,
            "drawn {} | pending {} | missing {} | empty {}",
            self.drawn, self.pending, self.missing, self.empty
        )?;
        writeln!(
            f,
            "inflight {}/{} | queue {}",
            self.inflight, self.max_inflight, self.queued
        )?;
        writeln!(f, "cache {}/{}", self.cache_len, self.cache_capacity)?;
        write!(f, "center x={:.0} y={:.0}", self.center.x, self.center.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport<A> {
    pub draws: Vec<TileDraw<A>>,
    pub stats: FrameStats,
}

/// Owns the whole streaming state and runs one frame at a time.
///
/// The driver does no I/O. Jobs it dispatches collect in an outbox that the
/// caller drains with [`FrameDriver::drain_dispatched`]; each outcome comes
/// back through [`FrameDriver::complete`].
#[derive(Debug)]
pub struct FrameDriver<A> {
    config: EngineConfig,
    extent: GridExtent,
    tile_size: TileSize,
    resolver: TileResolver,
    view: ViewTransform,
    cache: TileCache<A>,
    queue: LoadQueue,
    frame: Frame,
    redraw: RedrawGate,
    dispatched: Vec<LoadJob>,
}

impl<A: Clone> FrameDriver<A> {
    /// Builds the engine, resets to the start view and preloads the `A1`
    /// asset of every layer.
    pub fn new(
        world: WorldConfig,
        config: EngineConfig,
        viewport_width: f64,
        viewport_height: f64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !world.tile_size.is_valid() {
            return Err(ConfigError::MissingTileSize {
                width: world.tile_size.width,
                height: world.tile_size.height,
            });
        }

        let resolver = TileResolver::new(world.registry, config.asset_extension.clone());
        let view = ViewTransform::new(viewport_width, viewport_height)
            .with_zoom_rate(config.wheel_zoom_rate);
        let mut driver = Self {
            cache: TileCache::new(config.cache_capacity, config.eviction_fraction),
            queue: LoadQueue::new(config.max_inflight),
            extent: world.extent,
            tile_size: world.tile_size,
            resolver,
            view,
            frame: Frame::default(),
            redraw: RedrawGate::new(),
            dispatched: Vec::new(),
            config,
        };

        info!(
            layers = driver.resolver.registry().len(),
            rows = driver.extent.rows,
            cols = driver.extent.cols,
            tile_w = driver.tile_size.width,
            tile_h = driver.tile_size.height,
            "streaming engine started"
        );

        driver.reset_view();
        let first_keys: Vec<(LayerId, String)> = driver
            .resolver
            .registry()
            .iter()
            .filter_map(|layer| {
                let key = LocalKey::from_local(0, 0)?;
                Some((layer.id.clone(), driver.resolver.asset_key(&key)))
            })
            .collect();
        for (layer_id, asset_key) in &first_keys {
            driver.queue.enqueue(&mut driver.cache, layer_id, asset_key);
        }
        driver.pump();
        Ok(driver)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn resolver(&self) -> &TileResolver {
        &self.resolver
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn cache(&self) -> &TileCache<A> {
        &self.cache
    }

    pub fn queue(&self) -> &LoadQueue {
        &self.queue
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw.is_requested()
    }

    pub fn pan(&mut self, screen_delta: Vec2) {
        self.view.pan(screen_delta);
        self.redraw.request();
    }

    pub fn zoom_at(&mut self, cursor: Vec2, wheel_delta: f64) {
        self.view.zoom_at(cursor, wheel_delta);
        self.redraw.request();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.view.resize(width, height);
        self.redraw.request();
    }

    pub fn set_view(&mut self, scale: f64, offset: Vec2) {
        self.view.set(scale, offset);
        self.redraw.request();
    }

    pub fn reset_view(&mut self) {
        self.view.reset_to_start(
            self.tile_size,
            self.config.start_tiles_x,
            self.config.start_tiles_y,
            self.config.start_offset(),
        );
        self.redraw.request();
    }

    /// Queues one asset. See [`LoadQueue::enqueue`].
    pub fn enqueue(&mut self, layer_id: &LayerId, asset_key: &str) -> bool {
        self.queue.enqueue(&mut self.cache, layer_id, asset_key)
    }

    /// Starts queued jobs up to the in-flight cap.
    pub fn pump(&mut self) {
        let started = self.queue.pump(&mut self.cache);
        self.dispatched.extend(started);
    }

    /// Jobs dispatched since the last call. Each must be fetched and
    /// reported back through [`FrameDriver::complete`].
    pub fn drain_dispatched(&mut self) -> Vec<LoadJob> {
        mem::take(&mut self.dispatched)
    }

    /// Applies a fetch outcome and requests a redraw.
    pub fn complete(&mut self, job: &LoadJob, result: Result<A, AssetLoadError>) {
        let started = self.queue.complete(&mut self.cache, job, result);
        self.dispatched.extend(started);
        self.redraw.request();
    }

    /// Enqueues every servable asset of every layer, then pumps.
    ///
    /// Returns the number of enqueue attempts, including ones that were
    /// no-ops because the asset was already known.
    pub fn force_load_all(&mut self) -> usize {
        let mut jobs = Vec::new();
        for layer in self.resolver.registry().iter() {
            for key in layer.servable_keys() {
                jobs.push((layer.id.clone(), self.resolver.asset_key(&key)));
            }
        }
        for (layer_id, asset_key) in &jobs {
            self.queue.enqueue(&mut self.cache, layer_id, asset_key);
        }
        self.pump();
        self.redraw.request();
        info!(attempts = jobs.len(), queued = self.queue.queued(), "force load requested");
        jobs.len()
    }

    /// Runs a frame only if something asked for one.
    pub fn tick_if_needed(&mut self) -> Option<FrameReport<A>> {
        if self.redraw.is_requested() {
            Some(self.tick())
        } else {
            None
        }
    }

    /// Runs one frame: schedule loads for the visible cells nearest the
    /// center first, pump the queue, then classify every visible cell from
    /// the cache.
    pub fn tick(&mut self) -> FrameReport<A> {
        self.redraw.take();
        self.frame = self.frame.next();

        let mut cells: Vec<WorldCell> = self
            .view
            .visible_cells(self.extent, self.tile_size, self.config.visible_margin)
            .cells()
            .collect();
        if self.extent.is_known() {
            order_by_center_distance(&mut cells, self.view.center_in_tiles(self.tile_size));
        }
        let resolutions: Vec<(WorldCell, Option<Resolution>)> = cells
            .into_iter()
            .map(|cell| (cell, self.resolver.resolve(cell)))
            .collect();

        // Gaps cost nothing; every resolved cell spends one unit.
        let mut budget = FrameBudget::new(self.config.load_budget_per_frame);
        for (_, resolution) in &resolutions {
            if budget.is_exhausted() {
                break;
            }
            let Some(r) = resolution else { continue };
            budget.try_consume(1);
            self.queue.enqueue(&mut self.cache, &r.layer_id, &r.asset_key);
        }
        self.pump();

        let mut stats = FrameStats {
            frame: self.frame.index,
            world: self.extent,
            tile: self.tile_size,
            scale: self.view.scale(),
            visible: resolutions.len(),
            resolved: budget.spent_units() as usize,
            drawn: 0,
            pending: 0,
            missing: 0,
            empty: 0,
            inflight: 0,
            max_inflight: self.queue.max_inflight(),
            queued: 0,
            cache_len: 0,
            cache_capacity: self.cache.capacity(),
            center: self.view.center_world(),
            fetches: QueueCounters::default(),
            evicted: 0,
        };

        let mut draws = Vec::new();
        for (cell, resolution) in resolutions {
            let Some(r) = resolution else {
                stats.empty += 1;
                continue;
            };
            let key = CacheKey::new(r.layer_id, r.asset_key);
            match self.cache.get(&key) {
                AssetState::Ready(asset) => {
                    stats.drawn += 1;
                    draws.push(TileDraw::Tile {
                        cell,
                        dest: self.view.tile_dest_rect(cell, self.tile_size, TILE_OVERDRAW_PX),
                        layer_id: key.layer_id,
                        asset: asset.clone(),
                    });
                }
                AssetState::Pending => {
                    stats.pending += 1;
                    draws.push(TileDraw::Placeholder {
                        cell,
                        dest: self.view.tile_dest_rect(cell, self.tile_size, 0),
                    });
                }
                AssetState::Unrequested | AssetState::Failed(_) => stats.missing += 1,
            }
        }

        stats.inflight = self.queue.inflight();
        stats.queued = self.queue.queued();
        stats.cache_len = self.cache.len();
        stats.fetches = self.queue.counters();
        stats.evicted = self.cache.evicted_total();

        debug!(
            frame = stats.frame,
            visible = stats.visible,
            drawn = stats.drawn,
            pending = stats.pending,
            inflight = stats.inflight,
            "frame"
        );
        FrameReport { draws, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameDriver, TileDraw};
    use crate::config::{EngineConfig, WorldConfig};
    use crate::error::{AssetLoadError, ConfigError};
    use crate::request::LoadJob;
    use foundation::{ScreenRect, Vec2, WorldCell};
    use pretty_assertions::assert_eq;

    fn world(json_maps: &str, rows: u32, cols: u32) -> WorldConfig {
        WorldConfig::from_json(&format!(
            r#"{{ "world": {{ "rows": {rows}, "cols": {cols}, "tile": {{ "w": 100, "h": 100 }} }},
                 "maps": {json_maps} }}"#
        ))
        .unwrap()
    }

    fn small_engine() -> EngineConfig {
        EngineConfig {
            max_inflight: 2,
            load_budget_per_frame: 4,
            ..EngineConfig::default()
        }
    }

    fn keys(jobs: &[LoadJob]) -> Vec<String> {
        jobs.iter().map(|j| j.cache_key.to_string()).collect()
    }

    #[test]
    fn startup_preloads_first_asset_of_each_layer() {
        let mut d: FrameDriver<String> = FrameDriver::new(
            world(r#"[{ "id": "a", "z": 1 }, { "id": "b", "z": 3 }]"#, 10, 10),
            EngineConfig::default(),
            800.0,
            600.0,
        )
        .unwrap();
        assert_eq!(keys(&d.drain_dispatched()), vec!["b/A1.webp", "a/A1.webp"]);
        assert!(d.drain_dispatched().is_empty());
        assert!(d.needs_redraw());
    }

    #[test]
    fn invalid_engine_config_is_fatal() {
        let cfg = EngineConfig {
            max_inflight: 0,
            ..EngineConfig::default()
        };
        let err = FrameDriver::<String>::new(world(r#"[{ "id": "a" }]"#, 4, 4), cfg, 10.0, 10.0)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { name: "max_inflight", .. }));
    }

    #[test]
    fn tick_loads_center_first_within_budget() {
        let mut d: FrameDriver<String> =
            FrameDriver::new(world(r#"[{ "id": "m" }]"#, 10, 10), small_engine(), 300.0, 300.0)
                .unwrap();
        let preload = d.drain_dispatched();
        assert_eq!(keys(&preload), vec!["m/A1.webp"]);

        d.set_view(1.0, Vec2::ZERO);
        let report = d.tick();

        // Rows and cols 0..=3 are visible (3 tiles plus a margin of one).
        assert_eq!(report.stats.visible, 16);
        assert_eq!(report.stats.resolved, 4);
        // The four cells around the center (1.5, 1.5) are queued in
        // row-major order; one slot was left next to the preload.
        assert_eq!(keys(&d.drain_dispatched()), vec!["m/B2.webp"]);
        assert_eq!(report.stats.inflight, 2);
        assert_eq!(report.stats.queued, 3);
        assert_eq!(report.stats.pending, 2);
        assert_eq!(report.stats.missing, 14);
        assert_eq!(report.stats.drawn, 0);
        assert_eq!(report.stats.empty, 0);

        d.complete(&preload[0], Ok("a1".to_string()));
        assert_eq!(keys(&d.drain_dispatched()), vec!["m/B3.webp"]);

        let report = d.tick_if_needed().unwrap();
        assert_eq!(report.stats.drawn, 1);
        assert!(report.draws.contains(&TileDraw::Tile {
            cell: WorldCell::new(0, 0),
            layer_id: layers::LayerId::new("m"),
            asset: "a1".to_string(),
            dest: ScreenRect::new(0, 0, 101, 101),
        }));
        assert!(report.draws.contains(&TileDraw::Placeholder {
            cell: WorldCell::new(1, 1),
            dest: ScreenRect::new(100, 100, 100, 100),
        }));
    }

    #[test]
    fn inflight_cap_holds_across_frames() {
        let mut d: FrameDriver<String> =
            FrameDriver::new(world(r#"[{ "id": "m" }]"#, 20, 20), small_engine(), 900.0, 900.0)
                .unwrap();
        d.set_view(0.5, Vec2::ZERO);
        let mut running = d.drain_dispatched();
        for frame in 0..30 {
            d.tick();
            running.extend(d.drain_dispatched());
            assert!(d.queue().inflight() <= 2);
            assert_eq!(running.len(), d.queue().inflight());
            if let Some(job) = running.pop() {
                d.complete(&job, Ok(format!("f{frame}")));
                running.extend(d.drain_dispatched());
            }
        }
    }

    #[test]
    fn gaps_are_counted_as_empty() {
        let mut d: FrameDriver<String> = FrameDriver::new(
            world(r#"[{ "id": "m", "grid": { "rows": 1, "cols": 1 } }]"#, 2, 2),
            EngineConfig::default(),
            200.0,
            200.0,
        )
        .unwrap();
        d.set_view(1.0, Vec2::ZERO);
        let report = d.tick();
        assert_eq!(report.stats.visible, 4);
        assert_eq!(report.stats.resolved, 1);
        assert_eq!(report.stats.empty, 3);
    }

    #[test]
    fn failed_asset_stays_missing() {
        let mut d: FrameDriver<String> = FrameDriver::new(
            world(r#"[{ "id": "m", "grid": { "rows": 1, "cols": 1 } }]"#, 1, 1),
            EngineConfig::default(),
            100.0,
            100.0,
        )
        .unwrap();
        let jobs = d.drain_dispatched();
        d.complete(&jobs[0], Err(AssetLoadError::new("decode")));

        for _ in 0..3 {
            let report = d.tick();
            assert_eq!(report.stats.missing, 1);
            assert!(report.draws.is_empty());
            assert!(d.drain_dispatched().is_empty());
        }
        assert_eq!(d.queue().counters().failed, 1);
    }

    #[test]
    fn redraw_is_gated() {
        let mut d: FrameDriver<String> =
            FrameDriver::new(world(r#"[{ "id": "m" }]"#, 4, 4), EngineConfig::default(), 100.0, 100.0)
                .unwrap();
        assert!(d.tick_if_needed().is_some());
        assert!(d.tick_if_needed().is_none());

        d.pan(Vec2::new(5.0, 0.0));
        assert!(d.tick_if_needed().is_some());
        assert!(d.tick_if_needed().is_none());

        let job = d.drain_dispatched().remove(0);
        d.complete(&job, Ok("x".into()));
        let report = d.tick_if_needed().unwrap();
        assert_eq!(report.stats.frame, 3);
    }

    #[test]
    fn force_load_counts_servable_keys() {
        let mut d: FrameDriver<String> = FrameDriver::new(
            world(
                r#"[
                    { "id": "w", "z": 2, "include": { "A1": true, "A2": true }, "excludes": ["A2"] },
                    { "id": "a", "grid": { "rows": 2, "cols": 2 } }
                ]"#,
                4,
                4,
            ),
            EngineConfig::default(),
            100.0,
            100.0,
        )
        .unwrap();
        d.drain_dispatched();

        assert_eq!(d.force_load_all(), 5);
        // A1 of both layers was already in flight from the preload.
        let started = keys(&d.drain_dispatched());
        assert_eq!(started, vec!["a/A2.webp", "a/B1.webp", "a/B2.webp"]);
    }

    #[test]
    fn hud_lists_counters() {
        let mut d: FrameDriver<String> =
            FrameDriver::new(world(r#"[{ "id": "m" }]"#, 4, 4), EngineConfig::default(), 100.0, 100.0)
                .unwrap();
        let hud = d.tick().stats.to_string();
        assert!(hud.starts_with("world 4x4\ntile 100x100\n"));
        // 16 visible cells: the preloaded A1 plus 15 new jobs, 5 of which
        // fill the remaining slots.
        assert!(hud.contains("visible 16 | resolved 16\n"));
        assert!(hud.contains("inflight 6/6 | queue 10\n"));
        assert!(hud.contains("\ncenter x="));
    }
}
