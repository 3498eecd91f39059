//! Visibility snapshots and their cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bit_vec::BitVec;
use lru::LruCache;
use parking_lot::Mutex;

/// Immutable bit-per-row exclusion mask for one `(delete_barrier, insert_barrier)`.
///
/// Bit `i` set means insert offset `i` is excluded at this snapshot. The bitmap
/// is exactly `insert_barrier` bits long and accounts for the first
/// `delete_barrier` entries of the delete log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedBitmap {
    delete_barrier: i64,
    insert_barrier: i64,
    bits: BitVec,
}

impl DeletedBitmap {
    /// The empty snapshot every chain starts from.
    pub fn empty() -> Self {
        Self {
            delete_barrier: 0,
            insert_barrier: 0,
            bits: BitVec::new(),
        }
    }

    /// Copy of this snapshot's bits, resized to `insert_barrier`, tagged with new barriers.
    pub(crate) fn derive(&self, delete_barrier: i64, insert_barrier: i64) -> Self {
        let len = insert_barrier.max(0) as usize;
        let mut bits = self.bits.clone();
        if bits.len() < len {
            bits.grow(len - bits.len(), false);
        } else {
            bits.truncate(len);
        }
        Self {
            delete_barrier,
            insert_barrier,
            bits,
        }
    }

    pub fn delete_barrier(&self) -> i64 {
        self.delete_barrier
    }

    pub fn insert_barrier(&self) -> i64 {
        self.insert_barrier
    }

    /// Number of rows this bitmap spans.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Offsets outside the bitmap are never excluded.
    pub fn is_deleted(&self, offset: i64) -> bool {
        if offset < 0 {
            return false;
        }
        self.bits.get(offset as usize).unwrap_or(false)
    }

    pub fn deleted_count(&self) -> usize {
        self.bits.iter().filter(|bit| *bit).count()
    }

    pub fn deleted_offsets(&self) -> Vec<i64> {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| *bit)
            .map(|(i, _)| i as i64)
            .collect()
    }

    pub fn bits(&self) -> &BitVec {
        &self.bits
    }

    pub(crate) fn set(&mut self, offset: i64) {
        if offset >= 0 && (offset as usize) < self.bits.len() {
            self.bits.set(offset as usize, true);
        }
    }

    pub(crate) fn clear(&mut self, offset: i64) {
        if offset >= 0 && (offset as usize) < self.bits.len() {
            self.bits.set(offset as usize, false);
        }
    }
}

type SnapshotKey = (i64, i64);

/// Bounded LRU of visibility snapshots.
///
/// Never empty: it is seeded with [`DeletedBitmap::empty`] and entries are
/// only displaced by newer ones.
#[derive(Debug)]
pub struct BitmapCache {
    entries: Mutex<LruCache<SnapshotKey, Arc<DeletedBitmap>>>,
}

impl BitmapCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let mut entries = LruCache::new(capacity);
        let seed = Arc::new(DeletedBitmap::empty());
        entries.put(Self::key_of(&seed), seed);
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// The most recently used snapshot.
    pub fn most_recent(&self) -> Arc<DeletedBitmap> {
        let entries = self.entries.lock();
        match entries.iter().next() {
            Some((_, entry)) => entry.clone(),
            None => Arc::new(DeletedBitmap::empty()),
        }
    }

    /// Whether a snapshot for the barrier pair is cached. Recency is untouched.
    pub fn contains(&self, delete_barrier: i64, insert_barrier: i64) -> bool {
        self.entries
            .lock()
            .contains(&(delete_barrier, insert_barrier))
    }

    /// Publish a forward-derived snapshot.
    ///
    /// Returns false when a racing reader already advanced the chain past
    /// `entry`, in which case the cache is left unchanged.
    pub fn insert(&self, entry: Arc<DeletedBitmap>) -> bool {
        let mut entries = self.entries.lock();
        if let Some((_, latest)) = entries.iter().next()
            && entry.delete_barrier < latest.delete_barrier
        {
            return false;
        }
        entries.put(Self::key_of(&entry), entry);
        true
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn key_of(entry: &DeletedBitmap) -> SnapshotKey {
        (entry.delete_barrier, entry.insert_barrier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> BitmapCache {
        BitmapCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_derive_resizes() {
        let mut base = DeletedBitmap::empty().derive(1, 4);
        base.set(2);
        assert_eq!(base.len(), 4);

        let grown = base.derive(1, 8);
        assert_eq!(grown.len(), 8);
        assert!(grown.is_deleted(2));
        assert!(!grown.is_deleted(6));

        let shrunk = grown.derive(1, 2);
        assert_eq!(shrunk.len(), 2);
        assert!(!shrunk.is_deleted(2));
        assert_eq!(base.deleted_offsets(), vec![2]);
    }

    #[test]
    fn test_set_and_clear_out_of_range_ignored() {
        let mut bitmap = DeletedBitmap::empty().derive(0, 3);
        bitmap.set(5);
        bitmap.set(-1);
        assert_eq!(bitmap.deleted_count(), 0);
        bitmap.set(1);
        bitmap.clear(1);
        bitmap.clear(9);
        assert_eq!(bitmap.deleted_count(), 0);
        assert!(!bitmap.is_deleted(-3));
    }

    #[test]
    fn test_cache_seeded() {
        let cache = cache(2);
        assert_eq!(cache.len(), 1);
        let seed = cache.most_recent();
        assert_eq!(seed.delete_barrier(), 0);
        assert!(seed.is_empty());
    }

    #[test]
    fn test_cache_recency_and_eviction() {
        let cache = cache(2);
        let first = Arc::new(DeletedBitmap::empty().derive(1, 4));
        let second = Arc::new(first.derive(2, 4));
        assert!(cache.insert(first.clone()));
        assert!(cache.insert(second.clone()));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.most_recent().delete_barrier(), 2);

        // the seed was evicted
        assert!(!cache.contains(0, 0));

        assert!(cache.contains(1, 4));
        assert_eq!(cache.most_recent().delete_barrier(), 2);

        let third = Arc::new(second.derive(3, 4));
        assert!(cache.insert(third));
        assert!(!cache.contains(1, 4));
        assert!(cache.contains(2, 4));
    }

    #[test]
    fn test_cache_rejects_stale_forward_entry() {
        let cache = cache(4);
        assert!(cache.insert(Arc::new(DeletedBitmap::empty().derive(5, 4))));
        assert!(!cache.insert(Arc::new(DeletedBitmap::empty().derive(3, 4))));
        assert_eq!(cache.most_recent().delete_barrier(), 5);
        assert!(cache.insert(Arc::new(DeletedBitmap::empty().derive(5, 6))));
        assert_eq!(cache.most_recent().insert_barrier(), 6);
    }
}
