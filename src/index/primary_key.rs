//! Primary key to insert-offset multimap.

use ahash::AHashMap;
use parking_lot::RwLock;

/// Maps a primary key to every insert offset carrying it.
///
/// A key shows up more than once when it was deleted and inserted again.
/// Entries are published only after the row's column data is written, so
/// any offset found here is safe to read.
#[derive(Debug, Default)]
pub struct PrimaryKeyIndex {
    map: RwLock<AHashMap<i64, Vec<i64>>>,
}

impl PrimaryKeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a batch of `(primary_key, offset)` pairs under one lock.
    pub fn insert_batch(&self, entries: impl IntoIterator<Item = (i64, i64)>) {
        let mut map = self.map.write();
        for (primary_key, offset) in entries {
            map.entry(primary_key).or_default().push(offset);
        }
    }

    /// All offsets for `primary_key`, in publication order.
    pub fn offsets(&self, primary_key: i64) -> Vec<i64> {
        self.map
            .read()
            .get(&primary_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Run `f` over the offsets of `primary_key` without copying them.
    pub fn with_offsets<R>(&self, primary_key: i64, f: impl FnOnce(&[i64]) -> R) -> R {
        let map = self.map.read();
        match map.get(&primary_key) {
            Some(offsets) => f(offsets),
            None => f(&[]),
        }
    }
}
