//! Render command - draw one map frame into a PNG file.
//!
//! Missing tiles are fetched in the background. The frame is redrawn after
//! every completed fetch until no fetch is running or the timeout expires.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use fieldmap::config::ConfigFile;
use fieldmap::render::{FrameReport, PixmapCanvas};
use fieldmap::session::{network_provider, MapSession};
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::error::CliError;

/// Arguments for the render command.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Output PNG file
    #[arg(short, long, default_value = "map.png")]
    pub output: PathBuf,

    /// Center latitude in degrees (default: map.latitude)
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Center longitude in degrees (default: map.longitude)
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Zoom level 0-18 (default: map.zoom)
    #[arg(short, long)]
    pub zoom: Option<u8>,

    /// Image width in pixels
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 768)]
    pub height: u32,

    /// Use only cached tiles
    #[arg(long)]
    pub offline: bool,

    /// Outline every tile and label it with its z/x/y
    #[arg(long)]
    pub tile_frames: bool,

    /// Mark the center with the goto marker
    #[arg(long)]
    pub marker: bool,

    /// Seconds to wait for missing tiles
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

/// Run the render command.
pub fn run(args: RenderArgs, mut config: ConfigFile) -> Result<(), CliError> {
    if let Some(lat) = args.lat {
        config.map.latitude = lat;
    }
    if let Some(lon) = args.lon {
        config.map.longitude = lon;
    }
    if let Some(zoom) = args.zoom {
        config.map.zoom = zoom;
    }
    if args.offline {
        config.network.enabled = false;
    }
    if args.tile_frames {
        config.map.show_tile_frames = true;
    }

    let mut session = MapSession::open_with(
        &config,
        network_provider(&config)?,
        args.width,
        args.height,
        None,
    )?;
    if args.marker {
        let center = session.viewport().center();
        session.viewport_mut().goto_coordinate(center.lat, center.lon);
    }

    let mut canvas = PixmapCanvas::new(args.width, args.height)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(CliError::Runtime)?;

    let (report, frames) = render_until_idle(
        &mut session,
        &mut canvas,
        &runtime,
        Duration::from_secs(args.timeout),
    );
    canvas.save_png(&args.output)?;

    let stats = session.cache().stats();
    println!("Wrote {}", args.output.display());
    println!(
        "  Tiles:   {} drawn, {} missing",
        report.tiles_drawn, report.placeholders
    );
    println!(
        "  Fetches: {} completed, {} failed",
        stats.fetches_completed, stats.fetches_failed
    );
    println!("  Frames:  {}", frames);
    Ok(())
}

/// Renders until no tile fetch is running, redrawing after each repaint.
///
/// Returns the last frame's report and the number of frames drawn.
fn render_until_idle(
    session: &mut MapSession,
    canvas: &mut PixmapCanvas,
    runtime: &Runtime,
    timeout: Duration,
) -> (FrameReport, usize) {
    let deadline = Instant::now() + timeout;
    let mut report = session.render_frame(canvas);
    let mut frames = 1;
    let waited = session.cache().in_flight_count() > 0;

    while session.cache().in_flight_count() > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!(
                in_flight = session.cache().in_flight_count(),
                "Timed out waiting for tiles"
            );
            break;
        }
        let signal = session.repaint_signal().clone();
        if runtime.block_on(signal.wait_timeout(remaining)) {
            report = session.render_frame(canvas);
            frames += 1;
        }
    }

    // The last fetch lands in memory before its marker clears
    if waited {
        report = session.render_frame(canvas);
        frames += 1;
    }

    info!(frames, tiles = report.tiles_drawn, missing = report.placeholders, "Render finished");
    (report, frames)
}
