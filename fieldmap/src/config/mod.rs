//! User configuration.
//!
//! Settings live in an INI file at `<config_dir>/fieldmap/config.ini`. A
//! missing file means defaults, unknown keys are ignored and every known key
//! is described by a [`ConfigKey`] so the CLI can get and set values by name.

mod keys;

pub use keys::ConfigKey;

use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{TileCacheConfig, DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_MAX_MEMORY_TILES, DEFAULT_TILE_EXTENSION};
use crate::coord::GeoPoint;
use crate::provider::{DEFAULT_TILE_URL, DEFAULT_TIMEOUT_SECS};
use crate::render::{LayerVisibility, RenderOptions};
use crate::viewport::{DEFAULT_CENTER, DEFAULT_ZOOM};

/// Errors loading, saving or editing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub directory: PathBuf,
    pub memory_tiles: usize,
    pub extension: String,
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    pub enabled: bool,
    pub tile_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_concurrent: usize,
}

/// `[map]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
    pub show_tile_frames: bool,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggingSettings {
    /// Directory for rolling log files. Console only when unset.
    pub directory: Option<PathBuf>,
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub network: NetworkSettings,
    pub map: MapSettings,
    pub layers: LayerVisibility,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                directory: default_cache_dir(),
                memory_tiles: DEFAULT_MAX_MEMORY_TILES,
                extension: DEFAULT_TILE_EXTENSION.to_string(),
            },
            network: NetworkSettings {
                enabled: true,
                tile_url: DEFAULT_TILE_URL.to_string(),
                user_agent: default_user_agent(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
            },
            map: MapSettings {
                latitude: DEFAULT_CENTER.lat,
                longitude: DEFAULT_CENTER.lon,
                zoom: DEFAULT_ZOOM,
                show_tile_frames: false,
            },
            layers: LayerVisibility::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ConfigFile {
    /// Loads the configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads the configuration from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse(e.to_string()),
        })?;
        Self::from_ini(&ini)
    }

    /// Parses configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Renders the configuration as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }

    /// Writes the configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        self.to_ini().write_to_file(path).map_err(io_err)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Tile cache settings.
    pub fn tile_cache_config(&self) -> TileCacheConfig {
        TileCacheConfig::new(&self.cache.directory)
            .with_extension(self.cache.extension.clone())
            .with_max_memory_tiles(self.cache.memory_tiles)
            .with_max_concurrent_fetches(self.network.max_concurrent)
            .with_network_enabled(self.network.enabled)
    }

    /// Center and zoom to open the map at when nothing was persisted.
    pub fn initial_view(&self) -> (GeoPoint, u8) {
        (
            GeoPoint::new(self.map.latitude, self.map.longitude),
            self.map.zoom,
        )
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions::default().with_tile_frames(self.map.show_tile_frames)
    }
}

/// Location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldmap")
        .join("config.ini")
}

/// Default disk cache root.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldmap")
        .join("tiles")
}

fn default_user_agent() -> String {
    format!("fieldmap/{}", env!("CARGO_PKG_VERSION"))
}

/// Formats a byte count for humans.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
