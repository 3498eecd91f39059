//! Contiguous-completion watermark.
//!
//! Writers finish their reserved ranges in any order. [`AckResponder`]
//! keeps the ranges that completed ahead of the watermark and advances the
//! watermark whenever the gap in front of it is closed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;

/// Tracks the largest `w` such that `[0, w)` is fully written.
#[derive(Debug, Default)]
pub struct AckResponder {
    /// Completed ranges past the watermark, keyed by begin.
    pending: Mutex<BTreeMap<i64, i64>>,
    ack: AtomicI64,
}

impl AckResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `[begin, end)` as fully written.
    pub fn add_segment(&self, begin: i64, end: i64) {
        if end <= begin {
            return;
        }
        let mut pending = self.pending.lock();
        let mut ack = self.ack.load(Ordering::Acquire);
        if begin <= ack {
            ack = ack.max(end);
        } else {
            let slot = pending.entry(begin).or_insert(end);
            *slot = (*slot).max(end);
        }

        while let Some(entry) = pending.first_entry() {
            if *entry.key() > ack {
                break;
            }
            let (_, end) = entry.remove_entry();
            ack = ack.max(end);
        }
        self.ack.store(ack, Ordering::Release);
    }

    /// Current watermark.
    pub fn get_ack(&self) -> i64 {
        self.ack.load(Ordering::Acquire)
    }
}
