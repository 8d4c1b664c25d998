mod sources;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use foundation::Vec2;
use streaming::{ConfigSource, EngineConfig, FrameReport, StreamingSession};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sources::{FileConfigSource, HttpAssetFetcher, HttpConfigSource};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless tile-grid viewer: streams a layered world over HTTP")]
struct Args {
    /// Tile server base URL (default: $TILEGRID_URL or http://localhost:3000)
    #[arg(long)]
    url: Option<String>,

    /// Read the world configuration from this file instead of {url}/api/maps
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine tuning as JSON (any subset of the fields)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720.0)]
    height: f64,

    /// Number of frames to run
    #[arg(long, default_value_t = 300)]
    frames: u64,

    /// Frames per second (1 to 240)
    #[arg(long, default_value_t = 30.0, value_parser = parse_fps)]
    fps: f64,

    /// Screen-space pan applied every frame, x
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pan_x: f64,

    /// Screen-space pan applied every frame, y
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pan_y: f64,

    /// Wheel delta applied at the viewport center every frame
    #[arg(long, allow_hyphen_values = true)]
    zoom: Option<f64>,

    /// Enqueue every servable tile of every layer at startup
    #[arg(long)]
    force_load: bool,

    /// Override the maximum number of concurrent fetches
    #[arg(long)]
    max_inflight: Option<usize>,

    /// Override the tile cache capacity
    #[arg(long)]
    cache_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let base_url = args.url.clone().unwrap_or_else(|| {
        env::var("TILEGRID_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
    });

    let engine = load_engine_config(&args).await?;
    let world = match &args.config {
        Some(path) => FileConfigSource::new(path).fetch_world_config().await?,
        None => HttpConfigSource::new(&base_url).fetch_world_config().await?,
    };
    info!(
        url = %base_url,
        layers = world.registry.len(),
        rows = world.extent.rows,
        cols = world.extent.cols,
        "world configuration loaded"
    );

    let fetcher = Arc::new(HttpAssetFetcher::new(&base_url));
    let mut session = StreamingSession::new(fetcher, world, engine, args.width, args.height)?;

    if args.force_load {
        let attempts = session.force_load_all();
        warn!(attempts, "force load: every servable tile was enqueued");
    }

    let pan = Vec2::new(args.pan_x, args.pan_y);
    let center = Vec2::new(args.width, args.height) / 2.0;
    let mut ticker = tokio::time::interval(frame_period(args.fps));

    for _ in 0..args.frames {
        ticker.tick().await;

        let driver = session.driver_mut();
        if pan != Vec2::ZERO {
            driver.pan(pan);
        }
        if let Some(delta) = args.zoom {
            driver.zoom_at(center, delta);
        }

        if let Some(report) = session.tick() {
            log_frame(&report);
        }
    }

    let report = session.force_tick();
    println!("{}", report.stats);
    let fetches = report.stats.fetches;
    info!(
        dispatched = fetches.dispatched,
        succeeded = fetches.succeeded,
        failed = fetches.failed,
        evicted = report.stats.evicted,
        "session finished"
    );
    Ok(())
}

async fn load_engine_config(args: &Args) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut engine = match &args.engine {
        Some(path) => serde_json::from_slice(&tokio::fs::read(path).await?)?,
        None => EngineConfig::default(),
    };
    if let Some(max_inflight) = args.max_inflight {
        engine.max_inflight = max_inflight;
    }
    if let Some(capacity) = args.cache_capacity {
        engine.cache_capacity = capacity;
    }
    engine.validate()?;
    Ok(engine)
}

const MAX_FPS: f64 = 240.0;

fn parse_fps(raw: &str) -> Result<f64, String> {
    let fps: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if !fps.is_finite() || !(1.0..=MAX_FPS).contains(&fps) {
        return Err(format!("must be between 1 and {MAX_FPS}"));
    }
    Ok(fps)
}

/// Never zero, whatever `fps` holds.
fn frame_period(fps: f64) -> Duration {
    let fps = if fps.is_finite() { fps.clamp(1.0, MAX_FPS) } else { MAX_FPS };
    Duration::from_secs_f64(1.0 / fps)
}

fn log_frame<A>(report: &FrameReport<A>) {
    let s = &report.stats;
    info!(
        frame = s.frame,
        scale = s.scale,
        visible = s.visible,
        resolved = s.resolved,
        drawn = s.drawn,
        pending = s.pending,
        missing = s.missing,
        empty = s.empty,
        inflight = s.inflight,
        queued = s.queued,
        cache = s.cache_len,
        center_x = s.center.x.round(),
        center_y = s.center.y.round(),
        "frame"
    );
}

#[cfg(test)]
mod tests {
    use super::{Args, MAX_FPS, frame_period, parse_fps};
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn fps_must_be_finite_and_in_range() {
        assert_eq!(parse_fps("60"), Ok(60.0));
        assert!(parse_fps("inf").is_err());
        assert!(parse_fps("NaN").is_err());
        assert!(parse_fps("0").is_err());
        assert!(parse_fps("1000").is_err());
        assert!(Args::try_parse_from(["viewer", "--fps", "inf"]).is_err());
    }

    #[test]
    fn frame_period_is_never_zero() {
        assert_eq!(frame_period(f64::INFINITY), Duration::from_secs_f64(1.0 / MAX_FPS));
        assert_eq!(frame_period(f64::NAN), Duration::from_secs_f64(1.0 / MAX_FPS));
        assert_eq!(frame_period(0.0), Duration::from_secs(1));
    }
}
