//! Delete log: `(timestamp, primary key)` records plus the visibility cache.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::record::bitmap::BitmapCache;
use crate::storage::{AckResponder, ConcurrentVector};
use crate::Timestamp;

/// One entry of the delete log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteEntry {
    pub timestamp: Timestamp,
    pub primary_key: i64,
}

/// Append-only delete log.
///
/// A position in this log is a delete barrier: snapshot `b` accounts for
/// entries `[0, b)`.
#[derive(Debug)]
pub struct DeletedRecord {
    reserved: AtomicI64,
    pub(crate) ack_responder: AckResponder,
    pub(crate) timestamps: ConcurrentVector<Timestamp>,
    pub(crate) primary_keys: ConcurrentVector<i64>,
    pub(crate) cache: BitmapCache,
    size_per_chunk: usize,
}

impl DeletedRecord {
    pub fn new(size_per_chunk: usize, cache_capacity: NonZeroUsize) -> Self {
        Self {
            reserved: AtomicI64::new(0),
            ack_responder: AckResponder::new(),
            timestamps: ConcurrentVector::new(1, size_per_chunk),
            primary_keys: ConcurrentVector::new(1, size_per_chunk),
            cache: BitmapCache::new(cache_capacity),
            size_per_chunk,
        }
    }

    /// Claim `[begin, begin + size)` and return `begin`.
    ///
    /// A negative `size` claims nothing; the counter never moves backwards.
    pub fn reserve(&self, size: i64) -> i64 {
        self.reserved.fetch_add(size.max(0), Ordering::SeqCst)
    }

    pub fn reserved(&self) -> i64 {
        self.reserved.load(Ordering::SeqCst)
    }

    pub fn ack(&self) -> i64 {
        self.ack_responder.get_ack()
    }

    pub fn size_per_chunk(&self) -> usize {
        self.size_per_chunk
    }

    /// Cached visibility snapshots over this log.
    pub fn cache(&self) -> &BitmapCache {
        &self.cache
    }

    /// Entry at `index`, if it lies below the ack watermark.
    pub fn entry(&self, index: i64) -> Option<DeleteEntry> {
        if index < 0 || index >= self.ack() {
            return None;
        }
        Some(DeleteEntry {
            timestamp: self.timestamps.get_scalar(index as usize)?,
            primary_key: self.primary_keys.get_scalar(index as usize)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_visible_after_ack() {
        let record = DeletedRecord::new(4, NonZeroUsize::new(2).unwrap());
        let begin = record.reserve(2);
        assert_eq!(begin, 0);
        record.timestamps.set_data(0, &[25, 35], 2).unwrap();
        record.primary_keys.set_data(0, &[2, 1], 2).unwrap();

        assert_eq!(record.entry(0), None);
        record.ack_responder.add_segment(0, 2);
        assert_eq!(
            record.entry(1),
            Some(DeleteEntry {
                timestamp: 35,
                primary_key: 1
            })
        );
        assert_eq!(record.entry(2), None);
        assert_eq!(record.reserved(), record.ack());
    }
}
