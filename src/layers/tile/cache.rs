use super::types::{TileImage, TileKey, TileRecord};
use crate::prelude::HashMap;

/// Result of a cache lookup that may have created the record
#[derive(Debug)]
pub enum TileEntry<'a> {
    /// The key was already known; its recency stamp was refreshed
    Existing(&'a TileRecord),
    /// A fresh pending record; the caller owes it exactly one load request
    Created(&'a TileRecord),
}

impl<'a> TileEntry<'a> {
    pub fn record(&self) -> &'a TileRecord {
        match *self {
            TileEntry::Existing(record) | TileEntry::Created(record) => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, TileEntry::Created(_))
    }
}

/// Keyed store of tile records with recency-based eviction.
///
/// Only loaded tiles count against the budget. Pending and failed records
/// stay until their request is cancelled or the cache is cleared, so a key
/// is never fetched twice while it is known.
#[derive(Debug, Default)]
pub struct TileCache {
    records: HashMap<TileKey, TileRecord>,
    num_loaded: usize,
    next_serial: u64,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key` for drawing in `frame`, creating a pending record on
    /// first use. Keys outside the grid are ignored.
    pub fn get(&mut self, key: TileKey, frame: u64) -> Option<TileEntry<'_>> {
        if !key.is_valid() {
            return None;
        }

        let created = !self.records.contains_key(&key);
        if created {
            self.next_serial += 1;
            log::debug!("new tile record {} (serial {})", key, self.next_serial);
        }
        let serial = self.next_serial;
        let record = self
            .records
            .entry(key)
            .or_insert_with(|| TileRecord::new(serial, frame));
        record.last_draw_request = frame;

        Some(if created {
            TileEntry::Created(record)
        } else {
            TileEntry::Existing(record)
        })
    }

    /// Peek at a record without touching its recency
    pub fn record(&self, key: &TileKey) -> Option<&TileRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.records.contains_key(key)
    }

    /// Number of records in any state
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn num_loaded(&self) -> usize {
        self.num_loaded
    }

    /// Attach a decoded image to the pending record with this serial.
    ///
    /// Returns false when the record is gone, was replaced, or is no longer
    /// pending.
    pub fn attach_image(&mut self, key: &TileKey, serial: u64, image: TileImage) -> bool {
        match self.records.get_mut(key) {
            Some(record) if record.serial() == serial && record.is_pending() => {
                record.mark_loaded(image);
                self.num_loaded += 1;
                true
            }
            _ => false,
        }
    }

    /// Mark the pending record with this serial as failed. Failed records
    /// are kept so the tile is not requested again.
    pub fn mark_failed(&mut self, key: &TileKey, serial: u64) -> bool {
        match self.records.get_mut(key) {
            Some(record) if record.serial() == serial && record.is_pending() => {
                record.mark_failed();
                true
            }
            _ => false,
        }
    }

    /// Drop a pending record whose load was never started
    pub fn cancel(&mut self, key: &TileKey, serial: u64) -> bool {
        let cancellable = self
            .records
            .get(key)
            .is_some_and(|record| record.serial() == serial && record.is_pending());
        if cancellable {
            self.records.remove(key);
        }
        cancellable
    }

    /// Remove least recently drawn loaded tiles until at most `limit` remain.
    ///
    /// Ties on recency are broken by key so the outcome is deterministic.
    /// Returns the number of tiles removed.
    pub fn evict(&mut self, limit: usize) -> usize {
        if self.num_loaded <= limit {
            return 0;
        }

        let mut loaded: Vec<(u64, TileKey)> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_loaded())
            .map(|(key, record)| (record.last_draw_request(), *key))
            .collect();
        loaded.sort_unstable();

        let excess = loaded.len().saturating_sub(limit);
        for (_, key) in loaded.into_iter().take(excess) {
            self.records.remove(&key);
        }
        self.num_loaded -= excess;
        log::debug!("evicted {} tiles, {} loaded remain", excess, self.num_loaded);
        excess
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.num_loaded = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::tile::types::TileState;

    fn pixel() -> TileImage {
        TileImage::from_rgba(1, 1, vec![255, 255, 255, 255])
    }

    fn load(cache: &mut TileCache, key: TileKey, frame: u64) {
        let serial = cache.get(key, frame).unwrap().record().serial();
        assert!(cache.attach_image(&key, serial, pixel()));
    }

    #[test]
    fn test_get_creates_once_and_stamps_recency() {
        let mut cache = TileCache::new();
        let key = TileKey::new(1, 0, 1);

        let first = cache.get(key, 4).unwrap();
        assert!(first.is_created());
        let serial = first.record().serial();

        let second = cache.get(key, 7).unwrap();
        assert!(!second.is_created());
        assert_eq!(second.record().serial(), serial);
        assert_eq!(second.record().last_draw_request(), 7);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalid_keys_create_nothing() {
        let mut cache = TileCache::new();
        assert!(cache.get(TileKey::new(0, 1, 0), 0).is_none());
        assert!(cache.get(TileKey::new(2, 0, -1), 0).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stale_serial_is_ignored() {
        let mut cache = TileCache::new();
        let key = TileKey::new(0, 0, 0);
        let old = cache.get(key, 0).unwrap().record().serial();
        assert!(cache.cancel(&key, old));

        let new = cache.get(key, 1).unwrap().record().serial();
        assert_ne!(old, new);
        assert!(!cache.attach_image(&key, old, pixel()));
        assert!(cache.attach_image(&key, new, pixel()));
        assert!(!cache.cancel(&key, new));
        assert_eq!(cache.num_loaded(), 1);
    }

    #[test]
    fn test_evicts_least_recently_drawn() {
        let mut cache = TileCache::new();
        let keys: Vec<_> = (0..4).map(|x| TileKey::new(2, x, 0)).collect();
        for (key, frame) in keys.iter().zip([5, 1, 9, 3]) {
            load(&mut cache, *key, frame);
        }

        assert_eq!(cache.evict(2), 2);
        assert!(cache.contains(&keys[0]));
        assert!(!cache.contains(&keys[1]));
        assert!(cache.contains(&keys[2]));
        assert!(!cache.contains(&keys[3]));
        assert_eq!(cache.num_loaded(), 2);
    }

    #[test]
    fn test_eviction_within_budget_is_noop() {
        let mut cache = TileCache::new();
        load(&mut cache, TileKey::new(0, 0, 0), 0);
        assert_eq!(cache.evict(1), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_pending_and_failed_are_never_evicted() {
        let mut cache = TileCache::new();
        let pending = TileKey::new(1, 0, 0);
        let failed = TileKey::new(1, 1, 0);
        cache.get(pending, 0);
        let serial = cache.get(failed, 0).unwrap().record().serial();
        assert!(cache.mark_failed(&failed, serial));
        load(&mut cache, TileKey::new(1, 0, 1), 5);
        load(&mut cache, TileKey::new(1, 1, 1), 6);

        assert_eq!(cache.evict(1), 1);
        assert_eq!(cache.record(&pending).unwrap().state(), TileState::Pending);
        assert_eq!(cache.record(&failed).unwrap().state(), TileState::Failed);
        assert!(cache.contains(&TileKey::new(1, 1, 1)));
        assert!(!cache.mark_failed(&failed, serial));
    }
}
