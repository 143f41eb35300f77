//! Named configuration keys.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ConfigFile};
use crate::coord::MAX_ZOOM;
use crate::provider::TileUrlTemplate;

/// Every setting of the configuration file, addressable as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    CacheDirectory,
    CacheMemoryTiles,
    CacheExtension,
    NetworkEnabled,
    NetworkTileUrl,
    NetworkUserAgent,
    NetworkTimeoutSecs,
    NetworkMaxConcurrent,
    MapLatitude,
    MapLongitude,
    MapZoom,
    MapShowTileFrames,
    LayersMaps,
    LayersLogs,
    LayersNotes,
    LayersImages,
    LoggingDirectory,
}

const ALL_KEYS: [ConfigKey; 17] = [
    ConfigKey::CacheDirectory,
    ConfigKey::CacheMemoryTiles,
    ConfigKey::CacheExtension,
    ConfigKey::NetworkEnabled,
    ConfigKey::NetworkTileUrl,
    ConfigKey::NetworkUserAgent,
    ConfigKey::NetworkTimeoutSecs,
    ConfigKey::NetworkMaxConcurrent,
    ConfigKey::MapLatitude,
    ConfigKey::MapLongitude,
    ConfigKey::MapZoom,
    ConfigKey::MapShowTileFrames,
    ConfigKey::LayersMaps,
    ConfigKey::LayersLogs,
    ConfigKey::LayersNotes,
    ConfigKey::LayersImages,
    ConfigKey::LoggingDirectory,
];

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            CacheDirectory | CacheMemoryTiles | CacheExtension => "cache",
            NetworkEnabled | NetworkTileUrl | NetworkUserAgent | NetworkTimeoutSecs
            | NetworkMaxConcurrent => "network",
            MapLatitude | MapLongitude | MapZoom | MapShowTileFrames => "map",
            LayersMaps | LayersLogs | LayersNotes | LayersImages => "layers",
            LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            CacheDirectory | LoggingDirectory => "directory",
            CacheMemoryTiles => "memory_tiles",
            CacheExtension => "extension",
            NetworkEnabled => "enabled",
            NetworkTileUrl => "tile_url",
            NetworkUserAgent => "user_agent",
            NetworkTimeoutSecs => "timeout_secs",
            NetworkMaxConcurrent => "max_concurrent",
            MapLatitude => "latitude",
            MapLongitude => "longitude",
            MapZoom => "zoom",
            MapShowTileFrames => "show_tile_frames",
            LayersMaps => "maps",
            LayersLogs => "logs",
            LayersNotes => "notes",
            LayersImages => "images",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text. Unset optional values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        match self {
            CacheDirectory => config.cache.directory.display().to_string(),
            CacheMemoryTiles => config.cache.memory_tiles.to_string(),
            CacheExtension => config.cache.extension.clone(),
            NetworkEnabled => config.network.enabled.to_string(),
            NetworkTileUrl => config.network.tile_url.clone(),
            NetworkUserAgent => config.network.user_agent.clone(),
            NetworkTimeoutSecs => config.network.timeout_secs.to_string(),
            NetworkMaxConcurrent => config.network.max_concurrent.to_string(),
            MapLatitude => config.map.latitude.to_string(),
            MapLongitude => config.map.longitude.to_string(),
            MapZoom => config.map.zoom.to_string(),
            MapShowTileFrames => config.map.show_tile_frames.to_string(),
            LayersMaps => config.layers.maps.to_string(),
            LayersLogs => config.layers.logs.to_string(),
            LayersNotes => config.layers.notes.to_string(),
            LayersImages => config.layers.images.to_string(),
            LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parses and stores a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        match self {
            CacheDirectory => config.cache.directory = PathBuf::from(value),
            CacheMemoryTiles => config.cache.memory_tiles = self.parse_positive(value)?,
            CacheExtension => {
                let extension = value.trim_start_matches('.');
                if extension.is_empty() {
                    return Err(self.invalid(value, "must not be empty"));
                }
                config.cache.extension = extension.to_string();
            }
            NetworkEnabled => config.network.enabled = self.parse_bool(value)?,
            NetworkTileUrl => {
                TileUrlTemplate::parse(value).map_err(|e| self.invalid(value, &e.to_string()))?;
                config.network.tile_url = value.to_string();
            }
            NetworkUserAgent => config.network.user_agent = value.to_string(),
            NetworkTimeoutSecs => config.network.timeout_secs = self.parse_positive(value)? as u64,
            NetworkMaxConcurrent => config.network.max_concurrent = self.parse_positive(value)?,
            MapLatitude => config.map.latitude = self.parse_coordinate(value, 90.0)?,
            MapLongitude => config.map.longitude = self.parse_coordinate(value, 180.0)?,
            MapZoom => {
                let zoom: u8 = value
                    .parse()
                    .map_err(|_| self.invalid(value, "expected a whole number"))?;
                if zoom > MAX_ZOOM {
                    return Err(self.invalid(value, &format!("must be at most {}", MAX_ZOOM)));
                }
                config.map.zoom = zoom;
            }
            MapShowTileFrames => config.map.show_tile_frames = self.parse_bool(value)?,
            LayersMaps => config.layers.maps = self.parse_bool(value)?,
            LayersLogs => config.layers.logs = self.parse_bool(value)?,
            LayersNotes => config.layers.notes = self.parse_bool(value)?,
            LayersImages => config.layers.images = self.parse_bool(value)?,
            LoggingDirectory => {
                config.logging.directory = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn parse_bool(&self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(self.invalid(value, "expected true or false")),
        }
    }

    fn parse_positive(&self, value: &str) -> Result<usize, ConfigError> {
        match value.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(self.invalid(value, "expected a positive whole number")),
        }
    }

    fn parse_coordinate(&self, value: &str, limit: f64) -> Result<f64, ConfigError> {
        match value.parse::<f64>() {
            Ok(v) if v.abs() <= limit => Ok(v),
            _ => Err(self.invalid(value, &format!("expected degrees within ±{}", limit))),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        assert_eq!("cache.memory_tiles".parse::<ConfigKey>().unwrap(), ConfigKey::CacheMemoryTiles);
        assert_eq!("logging.directory".parse::<ConfigKey>().unwrap(), ConfigKey::LoggingDirectory);
        assert!(matches!(
            "cache.size".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<String> = ConfigKey::all().iter().map(ConfigKey::name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ConfigKey::all().len());
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();
        ConfigKey::MapShowTileFrames.set(&mut config, "yes").unwrap();
        ConfigKey::CacheExtension.set(&mut config, ".jpg").unwrap();

        assert_eq!(ConfigKey::MapShowTileFrames.get(&config), "true");
        assert_eq!(ConfigKey::CacheExtension.get(&config), "jpg");
    }

    #[test]
    fn test_empty_logging_directory_unsets() {
        let mut config = ConfigFile::default();
        ConfigKey::LoggingDirectory.set(&mut config, "/var/log/fieldmap").unwrap();
        assert!(config.logging.directory.is_some());
        ConfigKey::LoggingDirectory.set(&mut config, "").unwrap();
        assert!(config.logging.directory.is_none());
        assert_eq!(ConfigKey::LoggingDirectory.get(&config), "");
    }

    #[test]
    fn test_bad_bool_is_rejected() {
        let mut config = ConfigFile::default();
        let err = ConfigKey::NetworkEnabled.set(&mut config, "maybe").unwrap_err();
        assert!(err.to_string().contains("network.enabled"));
    }

    #[test]
    fn test_latitude_range() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::MapLatitude.set(&mut config, "91").is_err());
        ConfigKey::MapLatitude.set(&mut config, "-45.5").unwrap();
        assert_eq!(config.map.latitude, -45.5);
    }
}
