//! Prefetch command - fill the disk cache around a point.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use clap::Args;
use fieldmap::cache::{CacheStats, TileCache};
use fieldmap::config::ConfigFile;
use fieldmap::coord::{tile_key_for_point, GeoPoint, TileKey, MAX_ZOOM};
use fieldmap::session::network_provider;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::error::CliError;

/// Arguments for the prefetch command.
#[derive(Debug, Args)]
pub struct PrefetchArgs {
    /// Latitude of the area center in degrees
    #[arg(allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the area center in degrees
    #[arg(allow_hyphen_values = true)]
    pub lon: f64,

    /// Lowest zoom level to fetch
    #[arg(long, default_value_t = 12)]
    pub min_zoom: u8,

    /// Highest zoom level to fetch
    #[arg(long, default_value_t = 16)]
    pub max_zoom: u8,

    /// Tiles to fetch on each side of the center tile
    #[arg(short, long, default_value_t = 2)]
    pub radius: u32,

    /// Seconds to wait for downloads
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,
}

/// Run the prefetch command.
pub fn run(args: PrefetchArgs, config: ConfigFile) -> Result<(), CliError> {
    if args.min_zoom > args.max_zoom {
        return Err(CliError::Config(format!(
            "--min-zoom {} is above --max-zoom {}",
            args.min_zoom, args.max_zoom
        )));
    }
    if !config.network.enabled {
        println!("Network access is disabled (network.enabled = false); only cached tiles are checked.");
    }

    let center = GeoPoint::new(args.lat, args.lon);
    let keys = area_tiles(&center, args.min_zoom, args.max_zoom, args.radius);
    let total = keys.len() as u64;

    let cache = TileCache::builder(config.tile_cache_config(), network_provider(&config)?).build()?;
    println!(
        "Prefetching {} tiles into {}",
        total,
        config.cache.directory.display()
    );

    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} tiles ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    cache.prefetch(keys);

    let deadline = Instant::now() + Duration::from_secs(args.timeout);
    loop {
        let stats = cache.stats();
        let done = settled(&stats).min(total);
        bar.set_position(done);
        if done >= total && cache.in_flight_count() == 0 {
            bar.finish();
            break;
        }
        if Instant::now() >= deadline {
            warn!(in_flight = cache.in_flight_count(), "Prefetch timed out");
            bar.abandon_with_message("timed out");
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let stats = cache.stats();
    println!("  Already cached: {}", stats.disk_hits + stats.memory_hits);
    println!("  Downloaded:     {}", stats.fetches_completed);
    println!("  Failed:         {}", stats.fetches_failed);
    if stats.misses > 0 {
        println!("  Skipped:        {}", stats.misses);
    }
    Ok(())
}

/// Tiles whose outcome is known.
fn settled(stats: &CacheStats) -> u64 {
    stats.memory_hits
        + stats.disk_hits
        + stats.misses
        + stats.fetches_completed
        + stats.fetches_failed
        + stats.fetches_deduplicated
}

/// Square blocks of tiles around `center`, one per zoom level.
///
/// Columns wrap around the antimeridian and rows beyond the poles are left
/// out, so every key is unique and valid.
pub fn area_tiles(center: &GeoPoint, min_zoom: u8, max_zoom: u8, radius: u32) -> Vec<TileKey> {
    let radius = radius as i64;
    let mut keys = BTreeSet::new();
    for zoom in min_zoom..=max_zoom.min(MAX_ZOOM) {
        let middle = tile_key_for_point(center, zoom);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if let Some(key) = middle.offset(dx, dy) {
                    keys.insert(key);
                }
            }
        }
    }
    keys.into_iter().collect()
}
