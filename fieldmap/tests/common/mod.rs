//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use fieldmap::cache::TileCache;
use fieldmap::coord::TileKey;
use fieldmap::provider::{Provider, ProviderError};
use parking_lot::{Mutex, MutexGuard};

/// Encodes a 256x256 single-colour PNG tile.
pub fn png_tile(rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(256, 256, image::Rgba(rgba));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Tile server stand-in that counts requests and can be held back.
pub struct StubServer {
    calls: AtomicUsize,
    gate: Mutex<()>,
    response: Result<Vec<u8>, ProviderError>,
}

impl StubServer {
    pub fn serving(rgba: [u8; 4]) -> Self {
        Self::new(Ok(png_tile(rgba)))
    }

    pub fn failing() -> Self {
        Self::new(Err(ProviderError::HttpError("HTTP 503".into())))
    }

    fn new(response: Result<Vec<u8>, ProviderError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(()),
            response,
        }
    }

    /// Holds every download until the guard is dropped.
    pub fn hold(&self) -> MutexGuard<'_, ()> {
        self.gate.lock()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for StubServer {
    fn download_tile(&self, _key: &TileKey) -> Result<Vec<u8>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _open = self.gate.lock();
        self.response.clone()
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Polls until no fetch is running. Panics after five seconds.
pub async fn wait_idle(cache: &TileCache) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while cache.in_flight_count() > 0 {
        assert!(Instant::now() < deadline, "Fetches did not settle in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Polls until `condition` holds. Panics after five seconds.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "Condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
