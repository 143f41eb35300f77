//! Persistent disk tier.
//!
//! Tiles are stored as the encoded bytes received from the network, one file
//! per tile at `<root>/<zoom>/<x>/<y>.<extension>`. Writes go to a temporary
//! sibling first and are renamed into place, so readers never observe a
//! partially written tile and concurrent writers resolve to last-write-wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::error::CacheError;
use crate::coord::TileKey;

/// File extension used when none is configured.
pub const DEFAULT_TILE_EXTENSION: &str = "png";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Directory tree of encoded tiles.
#[derive(Debug, Clone)]
pub struct DiskTier {
    root: PathBuf,
    extension: String,
}

impl DiskTier {
    /// Creates a disk tier rooted at `root`. Nothing is created until the
    /// first write.
    ///
    /// # Arguments
    ///
    /// * `root` - Cache root directory
    /// * `extension` - File extension without the leading dot
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Location of a tile's file.
    pub fn tile_path(&self, key: &TileKey) -> PathBuf {
        self.root
            .join(key.zoom.to_string())
            .join(key.x.to_string())
            .join(format!("{}.{}", key.y, self.extension))
    }

    /// Reads a tile's bytes. A missing file is `Ok(None)`.
    pub fn read(&self, key: &TileKey) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.tile_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    /// Persists a tile's bytes, creating parent directories as needed.
    pub fn write(&self, key: &TileKey, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.tile_path(key);
        let io_err = |path: &Path, source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let temp = path.with_extension(format!(
            "{}.{}.tmp",
            self.extension,
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, bytes).map_err(|e| io_err(&temp, e))?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(io_err(&path, e));
        }

        debug!(tile = %key, bytes = bytes.len(), "Wrote tile to disk cache");
        Ok(())
    }

    /// Deletes a tile's file. Returns whether a file was removed.
    pub fn remove(&self, key: &TileKey) -> Result<bool, CacheError> {
        let path = self.tile_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.tile_path(key).is_file()
    }
}

/// Outcome of [`clear_disk_cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearResult {
    pub files_deleted: u64,
    pub bytes_freed: u64,
}

/// File count and total size of a disk cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    pub files: u64,
    pub bytes: u64,
}

/// Deletes every file below `root`, keeping `root` itself.
///
/// A missing root counts as an empty cache.
pub fn clear_disk_cache(root: &Path) -> io::Result<ClearResult> {
    let mut result = ClearResult::default();
    if !root.exists() {
        return Ok(result);
    }

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        let usage = directory_usage(&path)?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        result.files_deleted += usage.files;
        result.bytes_freed += usage.bytes;
    }
    Ok(result)
}

/// Counts the files below `root` and their total size.
pub fn disk_cache_stats(root: &Path) -> io::Result<DiskUsage> {
    if !root.exists() {
        return Ok(DiskUsage::default());
    }
    directory_usage(root)
}

fn directory_usage(path: &Path) -> io::Result<DiskUsage> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        return Ok(DiskUsage {
            files: 1,
            bytes: metadata.len(),
        });
    }

    let mut usage = DiskUsage::default();
    for entry in fs::read_dir(path)? {
        let child = directory_usage(&entry?.path())?;
        usage.files += child.files;
        usage.bytes += child.bytes;
    }
    Ok(usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tile_path_layout() {
        let tier = DiskTier::new("/cache", "png");
        assert_eq!(
            tier.tile_path(&TileKey::new(16, 34816, 22912)),
            PathBuf::from("/cache/16/34816/22912.png")
        );
    }

    #[test]
    fn test_extension_leading_dot_is_ignored() {
        let tier = DiskTier::new("/cache", ".jpg");
        assert_eq!(tier.extension(), "jpg");
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let tier = DiskTier::new(dir.path(), "png");
        assert!(tier.read(&TileKey::new(1, 0, 0)).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let tier = DiskTier::new(dir.path(), "png");
        let key = TileKey::new(5, 10, 12);

        tier.write(&key, b"tile bytes").unwrap();

        assert!(tier.contains(&key));
        assert_eq!(tier.read(&key).unwrap().unwrap(), b"tile bytes");
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let tier = DiskTier::new(dir.path(), "png");
        let key = TileKey::new(5, 10, 12);
        tier.write(&key, b"one").unwrap();
        tier.write(&key, b"two").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path().join("5/10"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["12.png".to_string()]);
        assert_eq!(tier.read(&key).unwrap().unwrap(), b"two");
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let tier = DiskTier::new(dir.path(), "png");
        let key = TileKey::new(2, 1, 1);
        tier.write(&key, b"x").unwrap();

        assert!(tier.remove(&key).unwrap());
        assert!(!tier.remove(&key).unwrap());
        assert!(!tier.contains(&key));
    }

    #[test]
    fn test_stats_and_clear() {
        let dir = TempDir::new().unwrap();
        let tier = DiskTier::new(dir.path(), "png");
        tier.write(&TileKey::new(1, 0, 0), &[0u8; 100]).unwrap();
        tier.write(&TileKey::new(1, 1, 0), &[0u8; 50]).unwrap();
        tier.write(&TileKey::new(3, 4, 5), &[0u8; 10]).unwrap();

        let usage = disk_cache_stats(dir.path()).unwrap();
        assert_eq!(usage, DiskUsage { files: 3, bytes: 160 });

        let cleared = clear_disk_cache(dir.path()).unwrap();
        assert_eq!(
            cleared,
            ClearResult {
                files_deleted: 3,
                bytes_freed: 160
            }
        );
        assert!(dir.path().exists(), "Root directory should survive a clear");
        assert_eq!(disk_cache_stats(dir.path()).unwrap(), DiskUsage::default());
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(disk_cache_stats(&missing).unwrap(), DiskUsage::default());
        assert_eq!(clear_disk_cache(&missing).unwrap(), ClearResult::default());
    }
}
