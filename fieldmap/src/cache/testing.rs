//! Stub tile source shared by cache and renderer tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::coord::TileKey;
use crate::provider::{Provider, ProviderError};

/// Provider that counts downloads and can be held back by a gate.
pub(crate) struct CountingProvider {
    calls: AtomicUsize,
    requested: Mutex<Vec<TileKey>>,
    gate: Mutex<()>,
    response: Result<Vec<u8>, ProviderError>,
}

impl CountingProvider {
    pub(crate) fn ok(bytes: Vec<u8>) -> Self {
        Self::with_response(Ok(bytes))
    }

    pub(crate) fn err(error: ProviderError) -> Self {
        Self::with_response(Err(error))
    }

    fn with_response(response: Result<Vec<u8>, ProviderError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
            gate: Mutex::new(()),
            response,
        }
    }

    /// Blocks downloads until the returned guard is dropped.
    pub(crate) fn close_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requested(&self) -> Vec<TileKey> {
        self.requested.lock().clone()
    }
}

impl Provider for CountingProvider {
    fn download_tile(&self, key: &TileKey) -> Result<Vec<u8>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(*key);
        let _open = self.gate.lock();
        self.response.clone()
    }

    fn name(&self) -> &str {
        "counting"
    }
}
