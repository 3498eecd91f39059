//! Ranked search output and the top-k collector that produces it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// Segment offset of an empty result slot.
pub const INVALID_OFFSET: i64 = -1;

/// Primary key of an empty result slot.
pub const INVALID_PRIMARY_KEY: i64 = -1;

/// Results of a batch of query vectors, `top_k` slots per query, row-major.
///
/// Slots a query could not fill carry [`INVALID_OFFSET`] and `f32::MAX`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub num_queries: usize,
    pub top_k: usize,
    pub seg_offsets: Vec<i64>,
    pub distances: Vec<f32>,
    /// Filled in by the segment after the search.
    pub primary_keys: Vec<i64>,
}

/// One ranked hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub seg_offset: i64,
    pub distance: f32,
    pub primary_key: i64,
}

impl QueryResult {
    /// All slots empty.
    pub fn new(num_queries: usize, top_k: usize) -> Self {
        let slots = num_queries * top_k;
        Self {
            num_queries,
            top_k,
            seg_offsets: vec![INVALID_OFFSET; slots],
            distances: vec![f32::MAX; slots],
            primary_keys: vec![INVALID_PRIMARY_KEY; slots],
        }
    }

    /// Build from one collector per query.
    pub fn from_collectors(top_k: usize, collectors: Vec<TopK>) -> Self {
        let mut result = Self::new(collectors.len(), top_k);
        for (query, collector) in collectors.into_iter().enumerate() {
            let base = query * top_k;
            for (slot, candidate) in collector.into_sorted().into_iter().enumerate() {
                result.seg_offsets[base + slot] = candidate.offset;
                result.distances[base + slot] = candidate.distance;
            }
        }
        result
    }

    /// Filled slots of query `query`, best first.
    pub fn hits(&self, query: usize) -> impl Iterator<Item = SearchHit> + '_ {
        let begin = (query * self.top_k).min(self.seg_offsets.len());
        let end = (begin + self.top_k).min(self.seg_offsets.len());
        (begin..end)
            .filter(|&slot| self.seg_offsets[slot] != INVALID_OFFSET)
            .map(|slot| SearchHit {
                seg_offset: self.seg_offsets[slot],
                distance: self.distances[slot],
                primary_key: self
                    .primary_keys
                    .get(slot)
                    .copied()
                    .unwrap_or(INVALID_PRIMARY_KEY),
            })
    }

    /// Number of filled slots across all queries.
    pub fn hit_count(&self) -> usize {
        self.seg_offsets
            .iter()
            .filter(|&&offset| offset != INVALID_OFFSET)
            .count()
    }
}

/// Scored candidate row.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub distance: f32,
    pub offset: i64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.offset.cmp(&other.offset))
    }
}

/// Bounded max-heap keeping the `k` closest candidates.
#[derive(Debug, Clone)]
pub struct TopK {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub fn push(&mut self, distance: f32, offset: i64) {
        if self.k == 0 {
            return;
        }
        let candidate = Candidate { distance, offset };
        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if let Some(worst) = self.heap.peek()
            && candidate < *worst
        {
            self.heap.pop();
            self.heap.push(candidate);
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Candidates, closest first.
    pub fn into_sorted(self) -> Vec<Candidate> {
        self.heap.into_sorted_vec()
    }
}
