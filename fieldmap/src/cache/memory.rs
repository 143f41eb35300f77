//! Bounded in-memory tier with first-in-first-out eviction.
//!
//! Entries are evicted in insertion order regardless of how recently they
//! were read. Reads never reorder the queue. Evicted surfaces are released
//! immediately so their pixel memory is returned before the new tile is
//! stored.

use std::collections::{HashMap, VecDeque};

use tracing::trace;

use super::image::TileImage;
use crate::coord::TileKey;

/// Default number of decoded tiles kept in memory.
pub const DEFAULT_MAX_MEMORY_TILES: usize = 16;

/// FIFO map from tile key to decoded surface.
///
/// Not synchronized on its own; the tile cache wraps it in a mutex so a
/// lookup, eviction and insertion happen as one step.
#[derive(Debug)]
pub struct MemoryTier {
    max_tiles: usize,
    entries: HashMap<TileKey, TileImage>,
    order: VecDeque<TileKey>,
}

impl MemoryTier {
    /// Creates an empty tier holding at most `max_tiles` entries.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(max_tiles: usize) -> Self {
        let max_tiles = max_tiles.max(1);
        Self {
            max_tiles,
            entries: HashMap::with_capacity(max_tiles),
            order: VecDeque::with_capacity(max_tiles),
        }
    }

    /// Returns a handle to the cached surface. Does not affect eviction order.
    pub fn get(&self, key: &TileKey) -> Option<TileImage> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores a surface, evicting the oldest entries first when full.
    ///
    /// Re-inserting a present key releases the previous surface and moves
    /// the key to the back of the queue. Returns the evicted keys, oldest
    /// first.
    pub fn insert(&mut self, key: TileKey, image: TileImage) -> Vec<TileKey> {
        if let Some(previous) = self.entries.get(&key) {
            if !previous.same_surface(&image) {
                previous.release();
            }
            self.entries.remove(&key);
            self.order.retain(|k| *k != key);
        }

        let mut evicted = Vec::new();
        while self.entries.len() >= self.max_tiles {
            match self.evict_oldest() {
                Some(old) => evicted.push(old),
                None => break,
            }
        }

        self.entries.insert(key, image);
        self.order.push_back(key);
        evicted
    }

    /// Stores a surface unless the key is already resident.
    ///
    /// Returns the surface now held for `key` and the evicted keys. When
    /// another surface is already resident it is kept and returned, and
    /// `image` is dropped without being released, so handles given out
    /// earlier stay drawable.
    pub fn get_or_insert(&mut self, key: TileKey, image: TileImage) -> (TileImage, Vec<TileKey>) {
        if let Some(resident) = self.entries.get(&key) {
            return (resident.clone(), Vec::new());
        }
        let evicted = self.insert(key, image.clone());
        (image, evicted)
    }

    fn evict_oldest(&mut self) -> Option<TileKey> {
        let key = *self.order.front()?;
        if let Some(image) = self.entries.get(&key) {
            let freed = image.release();
            trace!(tile = %key, bytes = freed, "Evicted tile from memory");
        }
        self.entries.remove(&key);
        self.order.pop_front();
        Some(key)
    }

    /// Releases every surface and empties the tier. Returns the entry count.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        for image in self.entries.values() {
            image.release();
        }
        self.entries.clear();
        self.order.clear();
        count
    }

    /// Keys in eviction order, oldest first.
    pub fn keys_in_order(&self) -> Vec<TileKey> {
        self.order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_tiles(&self) -> usize {
        self.max_tiles
    }

    /// Bytes held by resident surfaces.
    pub fn size_bytes(&self) -> usize {
        self.entries.values().map(TileImage::byte_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(i: u32) -> TileImage {
        TileImage::solid(2, 2, [i as u8, 0, 0, 255]).unwrap()
    }

    #[test]
    fn test_seventeenth_insert_evicts_first() {
        let mut tier = MemoryTier::new(DEFAULT_MAX_MEMORY_TILES);
        let keys: Vec<TileKey> = (0..17).map(|i| TileKey::new(16, i, 0)).collect();
        let images: Vec<TileImage> = (0..17).map(tile).collect();

        for (key, image) in keys.iter().zip(&images).take(16) {
            assert!(tier.insert(*key, image.clone()).is_empty());
        }
        let evicted = tier.insert(keys[16], images[16].clone());

        assert_eq!(evicted, vec![keys[0]]);
        assert_eq!(tier.len(), 16);
        assert!(!tier.contains(&keys[0]));
        assert!(images[0].is_released(), "Evicted surface should be released");
        assert_eq!(tier.keys_in_order(), keys[1..].to_vec());
    }

    #[test]
    fn test_reads_do_not_change_order() {
        let mut tier = MemoryTier::new(2);
        let a = TileKey::new(1, 0, 0);
        let b = TileKey::new(1, 1, 0);
        let c = TileKey::new(1, 0, 1);
        tier.insert(a, tile(1));
        tier.insert(b, tile(2));

        // Reading `a` would save it under LRU, not under FIFO
        assert!(tier.get(&a).is_some());
        let evicted = tier.insert(c, tile(3));

        assert_eq!(evicted, vec![a]);
    }

    #[test]
    fn test_reinsert_moves_key_to_back_and_releases_previous() {
        let mut tier = MemoryTier::new(3);
        let a = TileKey::new(2, 0, 0);
        let b = TileKey::new(2, 1, 0);
        let first = tile(1);
        tier.insert(a, first.clone());
        tier.insert(b, tile(2));

        let replacement = tile(3);
        assert!(tier.insert(a, replacement.clone()).is_empty());

        assert!(first.is_released());
        assert!(!replacement.is_released());
        assert_eq!(tier.len(), 2);
        assert_eq!(tier.keys_in_order(), vec![b, a]);
    }

    #[test]
    fn test_reinsert_same_surface_keeps_pixels() {
        let mut tier = MemoryTier::new(2);
        let key = TileKey::new(0, 0, 0);
        let image = tile(1);
        tier.insert(key, image.clone());
        tier.insert(key, image.clone());

        assert!(!image.is_released());
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_get_or_insert_keeps_resident_surface() {
        let mut tier = MemoryTier::new(4);
        let key = TileKey::new(5, 3, 3);
        let first = tile(1);
        let (held, evicted) = tier.get_or_insert(key, first.clone());
        assert!(held.same_surface(&first));
        assert!(evicted.is_empty());

        let second = tile(2);
        let (held, _) = tier.get_or_insert(key, second.clone());

        assert!(held.same_surface(&first), "Resident surface wins");
        assert!(!first.is_released());
        assert!(!second.is_released());
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_get_or_insert_evicts_when_full() {
        let mut tier = MemoryTier::new(2);
        tier.get_or_insert(TileKey::new(1, 0, 0), tile(0));
        tier.get_or_insert(TileKey::new(1, 1, 0), tile(1));
        let (_, evicted) = tier.get_or_insert(TileKey::new(1, 0, 1), tile(2));
        assert_eq!(evicted, vec![TileKey::new(1, 0, 0)]);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut tier = MemoryTier::new(4);
        let images: Vec<TileImage> = (0..3).map(tile).collect();
        for (i, image) in images.iter().enumerate() {
            tier.insert(TileKey::new(3, i as u32, 0), image.clone());
        }

        assert_eq!(tier.clear(), 3);
        assert!(tier.is_empty());
        assert!(tier.keys_in_order().is_empty());
        assert!(images.iter().all(TileImage::is_released));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut tier = MemoryTier::new(0);
        tier.insert(TileKey::new(0, 0, 0), tile(0));
        tier.insert(TileKey::new(1, 0, 0), tile(1));
        assert_eq!(tier.len(), 1);
        assert_eq!(tier.max_tiles(), 1);
    }

    #[test]
    fn test_size_bytes() {
        let mut tier = MemoryTier::new(4);
        tier.insert(TileKey::new(0, 0, 0), tile(0));
        tier.insert(TileKey::new(1, 0, 0), tile(1));
        assert_eq!(tier.size_bytes(), 2 * 2 * 2 * 4);
    }
}
