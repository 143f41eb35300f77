//! Persisting the last viewed position between sessions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors reading or writing the persisted viewport.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to access viewport state at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid viewport state: {0}")]
    Json(#[from] serde_json::Error),
}

/// Center and zoom as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub lon: f64,
    pub lat: f64,
    pub zoom: u8,
}

impl ViewportState {
    /// Default location of the state file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("fieldmap").join("viewport.json"))
    }

    /// Loads a saved state. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, StateError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Writes the state, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let io_err = |source| StateError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)?;
        debug!(path = %path.display(), zoom = self.zoom, "Saved viewport state");
        Ok(())
    }
}
