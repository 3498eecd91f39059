//! Registry of externally built per-field indexes.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::{Result, SegcoreError};
use crate::schema::{FieldId, FieldOffset};
use crate::search::{BitsetView, DistanceMetric, QueryResult, SearchParams};

/// Key under which the metric type travels in index parameters.
pub const METRIC_TYPE_KEY: &str = "metric_type";

/// A ready-made vector index over segment offsets.
///
/// Implementations live outside this crate (ANN libraries); the segment only
/// routes queries to them and hands over the exclusion filter.
pub trait VectorIndex: Send + Sync + Debug {
    /// Dimension of the indexed vectors.
    fn dimension(&self) -> usize;

    /// Number of indexed rows.
    fn row_count(&self) -> usize;

    /// Search `query_count` row-major query vectors. Rows excluded by
    /// `filter` must not appear in the result.
    fn search(
        &self,
        queries: &[f32],
        query_count: usize,
        metric: DistanceMetric,
        params: &SearchParams,
        filter: BitsetView<'_>,
    ) -> Result<QueryResult>;
}

/// Everything needed to attach an index to a field.
#[derive(Debug, Clone)]
pub struct LoadIndexInfo {
    pub field_id: FieldId,
    pub index_params: HashMap<String, String>,
    pub index: Arc<dyn VectorIndex>,
}

impl LoadIndexInfo {
    pub fn new(field_id: FieldId, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            field_id,
            index_params: HashMap::new(),
            index,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.index_params.insert(key.into(), value.into());
        self
    }

    /// Parsed `metric_type` parameter.
    pub fn metric_type(&self) -> Result<DistanceMetric> {
        let raw = self
            .index_params
            .get(METRIC_TYPE_KEY)
            .ok_or(SegcoreError::MissingMetricType)?;
        DistanceMetric::parse_str(raw)
    }
}

/// A loaded index together with the metric it was built for.
#[derive(Debug, Clone)]
pub struct SealedIndexEntry {
    pub metric: DistanceMetric,
    pub index: Arc<dyn VectorIndex>,
}

/// Per-field sealed indexes plus the indexing watermark of growing data.
#[derive(Debug, Default)]
pub struct SealedIndexRegistry {
    entries: RwLock<AHashMap<FieldOffset, SealedIndexEntry>>,
    indexing: IndexingRecord,
}

impl SealedIndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `index` to `field`, replacing any earlier entry.
    pub fn add_entry(
        &self,
        field: FieldOffset,
        metric: DistanceMetric,
        index: Arc<dyn VectorIndex>,
    ) -> Option<SealedIndexEntry> {
        self.entries
            .write()
            .insert(field, SealedIndexEntry { metric, index })
    }

    pub fn remove_entry(&self, field: FieldOffset) -> Option<SealedIndexEntry> {
        self.entries.write().remove(&field)
    }

    pub fn is_ready(&self, field: FieldOffset) -> bool {
        self.entries.read().contains_key(&field)
    }

    pub fn get_entry(&self, field: FieldOffset) -> Option<SealedIndexEntry> {
        self.entries.read().get(&field).cloned()
    }

    pub fn indexing(&self) -> &IndexingRecord {
        &self.indexing
    }

    /// Route a search to the sealed index of `field`.
    ///
    /// The index's own metric wins unless the request overrides it.
    pub fn search(
        &self,
        field: FieldOffset,
        queries: &[f32],
        query_count: usize,
        params: &SearchParams,
        filter: BitsetView<'_>,
    ) -> Result<QueryResult> {
        let entry = self
            .get_entry(field)
            .ok_or_else(|| SegcoreError::index(format!("no sealed index for field {field}")))?;
        let metric = params.metric.unwrap_or(entry.metric);
        entry
            .index
            .search(queries, query_count, metric, params, filter)
    }
}

/// How far growing data has been acknowledged, in whole chunks.
///
/// Rows past this point are only reachable by brute force.
#[derive(Debug, Default)]
pub struct IndexingRecord {
    resource_ack: AtomicI64,
}

impl IndexingRecord {
    /// Record that the first `chunks` chunks are fully acked. Never moves back.
    pub fn update_resource_ack(&self, chunks: i64) {
        self.resource_ack.fetch_max(chunks, Ordering::AcqRel);
    }

    pub fn resource_ack(&self) -> i64 {
        self.resource_ack.load(Ordering::Acquire)
    }
}
