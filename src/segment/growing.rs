//! The growing segment.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use bit_vec::BitVec;
use log::{debug, error, info, warn};

use crate::config::SegmentConfig;
use crate::error::{Result, SegcoreError};
use crate::index::{LoadIndexInfo, PrimaryKeyIndex, SealedIndexRegistry};
use crate::record::{DeletedBitmap, DeletedRecord, InsertRecord};
use crate::schema::{DataType, FieldId, FieldOffset, Schema};
use crate::search::{BitsetView, QueryResult, SearchParams, search_on_growing};
use crate::segment::row_batch::{self, RowBatch};
use crate::segment::visibility::resolve_delete_target;
use crate::segment::{Barriers, SegmentState};
use crate::storage::ChunkView;
use crate::Timestamp;

/// Per-row bytes charged to the insert log on top of the schema row:
/// timestamp, primary key and one byte of visibility bitmap.
const INSERT_ROW_OVERHEAD_BYTES: i64 = 8 + 8 + 1;

/// Per-row bytes charged to the delete log.
const DELETE_ROW_BYTES: i64 = 32;

/// An append-only segment that is still receiving rows.
///
/// Writers follow a two-phase protocol: [`pre_insert`](Self::pre_insert)
/// claims an offset range, [`insert`](Self::insert) fills and acknowledges
/// it. Deletes work the same way through [`pre_delete`](Self::pre_delete)
/// and [`delete`](Self::delete). Every method takes `&self`; share the
/// segment across threads by reference or `Arc`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use segcore::config::SegmentConfig;
/// use segcore::schema::{DataType, Schema};
/// use segcore::segment::{RowBatch, SegmentGrowing};
///
/// let schema = Schema::builder()
///     .add_field(100, "age", DataType::Int32)
///     .build()
///     .unwrap();
/// let segment = SegmentGrowing::new(Arc::new(schema), SegmentConfig::default()).unwrap();
///
/// let rows: Vec<u8> = [30i32, 40].iter().flat_map(|v| v.to_le_bytes()).collect();
/// let begin = segment.pre_insert(2);
/// segment
///     .insert(begin, 2, &[1, 2], &[10, 20], &RowBatch::new(&rows, 4, 2))
///     .unwrap();
/// assert_eq!(segment.row_count(), 2);
///
/// let begin = segment.pre_delete(1);
/// segment.delete(begin, 1, &[2], &[25]).unwrap();
///
/// let bitmap = segment.get_deleted_bitmap(1, 30, 2, true).unwrap();
/// assert_eq!(bitmap.deleted_offsets(), vec![1]);
/// ```
#[derive(Debug)]
pub struct SegmentGrowing {
    schema: Arc<Schema>,
    config: SegmentConfig,
    insert_record: InsertRecord,
    deleted_record: DeletedRecord,
    pk_index: PrimaryKeyIndex,
    sealed_indexes: SealedIndexRegistry,
    state: AtomicU8,
}

impl SegmentGrowing {
    pub fn new(schema: Arc<Schema>, config: SegmentConfig) -> Result<Self> {
        config.validate()?;
        let cache_capacity = NonZeroUsize::new(config.bitmap_cache_capacity)
            .ok_or_else(|| SegcoreError::invalid_config("bitmap_cache_capacity must be positive"))?;

        Ok(Self {
            insert_record: InsertRecord::new(&schema, config.chunk_size),
            deleted_record: DeletedRecord::new(config.chunk_size, cache_capacity),
            pk_index: PrimaryKeyIndex::new(),
            sealed_indexes: SealedIndexRegistry::new(),
            state: AtomicU8::new(SegmentState::Open as u8),
            schema,
            config,
        })
    }

    /// Reserve `size` insert offsets and return the first one.
    ///
    /// Negative sizes reserve nothing and return the current reservation.
    pub fn pre_insert(&self, size: i64) -> i64 {
        self.insert_record.reserve(size)
    }

    /// Write and acknowledge `size` rows into `[begin, begin + size)`.
    ///
    /// Rows are stored sorted by `(timestamp, primary key)`. All arguments are
    /// validated before anything is written, so a failed call leaves the
    /// segment untouched.
    pub fn insert(
        &self,
        begin: i64,
        size: i64,
        primary_keys: &[i64],
        timestamps: &[Timestamp],
        rows: &RowBatch<'_>,
    ) -> Result<()> {
        self.ensure_open()?;

        let expected = self.schema.total_sizeof();
        if rows.sizeof_per_row != expected {
            warn!(
                "rejecting insert of {size} rows at {begin}: row size {} but schema expects {expected}",
                rows.sizeof_per_row
            );
            return Err(SegcoreError::schema_mismatch(rows.sizeof_per_row, expected));
        }

        let len = self.check_range(begin, size, self.insert_record.reserved(), "insert")?;
        if rows.count != len
            || primary_keys.len() != len
            || timestamps.len() != len
            || rows.data.len() != len * expected
        {
            return Err(SegcoreError::invalid_argument(format!(
                "insert of {len} rows got {} keys, {} timestamps, {} rows in {} bytes",
                primary_keys.len(),
                timestamps.len(),
                rows.count,
                rows.data.len()
            )));
        }
        if len == 0 {
            return Ok(());
        }

        let batch = row_batch::sort_and_transpose(&self.schema, primary_keys, timestamps, rows);
        let offset = begin as usize;
        self.insert_record
            .timestamps
            .set_data(offset, &batch.timestamps, len)?;
        self.insert_record
            .primary_keys
            .set_data(offset, &batch.primary_keys, len)?;
        for (field, column) in batch.columns.iter().enumerate() {
            self.insert_record
                .write_field(FieldOffset(field), offset, column, len)?;
        }

        // column data first, so any offset found through the index is readable
        self.pk_index.insert_batch(
            batch
                .primary_keys
                .iter()
                .enumerate()
                .map(|(i, &pk)| (pk, begin + i as i64)),
        );

        self.insert_record
            .ack_responder
            .add_segment(begin, begin + size);
        let chunk_size = self.config.chunk_size as i64;
        self.sealed_indexes
            .indexing()
            .update_resource_ack(self.insert_record.ack() / chunk_size);
        Ok(())
    }

    /// Reserve `size` delete-log entries and return the first one.
    pub fn pre_delete(&self, size: i64) -> i64 {
        self.deleted_record.reserve(size)
    }

    /// Write and acknowledge `size` delete entries into `[begin, begin + size)`.
    ///
    /// No visibility state is touched here; snapshots pick the entries up
    /// lazily in [`get_deleted_bitmap`](Self::get_deleted_bitmap).
    pub fn delete(
        &self,
        begin: i64,
        size: i64,
        primary_keys: &[i64],
        timestamps: &[Timestamp],
    ) -> Result<()> {
        self.ensure_open()?;

        let len = self.check_range(begin, size, self.deleted_record.reserved(), "delete")?;
        if primary_keys.len() != len || timestamps.len() != len {
            return Err(SegcoreError::invalid_argument(format!(
                "delete of {len} rows got {} keys and {} timestamps",
                primary_keys.len(),
                timestamps.len()
            )));
        }
        if len == 0 {
            return Ok(());
        }

        let (sorted_timestamps, sorted_keys) = row_batch::sort_deletes(primary_keys, timestamps);
        let offset = begin as usize;
        self.deleted_record
            .timestamps
            .set_data(offset, &sorted_timestamps, len)?;
        self.deleted_record
            .primary_keys
            .set_data(offset, &sorted_keys, len)?;
        self.deleted_record
            .ack_responder
            .add_segment(begin, begin + size);
        Ok(())
    }

    /// Seal the segment against further writes.
    ///
    /// Fails with [`SegcoreError::PendingWrites`] while either log holds
    /// reserved but unacknowledged rows; the segment then stays open.
    pub fn close(&self) -> Result<()> {
        for (log, reserved, acked) in [
            (
                "insert",
                self.insert_record.reserved(),
                self.insert_record.ack(),
            ),
            (
                "delete",
                self.deleted_record.reserved(),
                self.deleted_record.ack(),
            ),
        ] {
            if reserved != acked {
                error!(
                    "cannot close segment: {log} log reserved {reserved} rows, acked {acked}"
                );
                return Err(SegcoreError::PendingWrites {
                    log,
                    reserved,
                    acked,
                });
            }
        }

        let previous = self
            .state
            .swap(SegmentState::Closed as u8, Ordering::AcqRel);
        if SegmentState::from_u8(previous) == SegmentState::Open {
            info!(
                "segment closed with {} rows and {} deletes",
                self.insert_record.ack(),
                self.deleted_record.ack()
            );
        }
        Ok(())
    }

    /// Attach an externally built index to a vector field.
    pub fn load_index(&self, info: LoadIndexInfo) -> Result<()> {
        let (offset, meta) = self.schema.resolve(info.field_id)?;
        let metric = info.metric_type().inspect_err(|e| {
            if matches!(e, SegcoreError::MissingMetricType) {
                error!("index for field {} loaded without metric type", info.field_id);
            }
        })?;

        let Some(dim) = meta.data_type.dimension() else {
            return Err(SegcoreError::index(format!(
                "field {} ({}) is not a vector field",
                info.field_id, meta.name
            )));
        };
        if info.index.dimension() != dim {
            return Err(SegcoreError::index(format!(
                "index dimension {} does not match field {} dimension {dim}",
                info.index.dimension(),
                meta.name
            )));
        }

        let replaced = self.sealed_indexes.add_entry(offset, metric, info.index);
        info!(
            "loaded {metric} index on field {} ({}){}",
            info.field_id,
            meta.name,
            if replaced.is_some() { ", replacing previous" } else { "" }
        );
        Ok(())
    }

    /// Detach the sealed index of `field_id`. Returns whether one was loaded.
    pub fn drop_index(&self, field_id: FieldId) -> Result<bool> {
        let (offset, _) = self.schema.resolve(field_id)?;
        let dropped = self.sealed_indexes.remove_entry(offset).is_some();
        if dropped {
            info!("dropped index on field {field_id}");
        }
        Ok(dropped)
    }

    /// Top-k search over a float vector field.
    ///
    /// Goes to the sealed index when one is loaded for the field, otherwise
    /// scans the acked growing rows. Rows excluded by `filter` never appear.
    pub fn vector_search(
        &self,
        field_id: FieldId,
        queries: &[f32],
        query_count: usize,
        filter: BitsetView<'_>,
        params: &SearchParams,
    ) -> Result<QueryResult> {
        params.validate()?;
        let (offset, meta) = self.schema.resolve(field_id)?;
        let DataType::FloatVector { dim } = meta.data_type else {
            return Err(SegcoreError::invalid_argument(format!(
                "field {field_id} ({}) is not a float vector field",
                meta.name
            )));
        };

        let mut result = if self.sealed_indexes.is_ready(offset) {
            debug!("searching field {field_id} through sealed index");
            self.sealed_indexes
                .search(offset, queries, query_count, params, filter)?
        } else {
            let metric = params.metric.or(meta.metric).unwrap_or_default();
            let (result, stats) = search_on_growing(
                &self.insert_record,
                offset,
                dim,
                metric,
                queries,
                query_count,
                params.top_k,
                filter,
            )?;
            debug!(
                "growing scan of field {field_id}: {} chunks, {} rows, {} filtered, {} chunks indexable",
                stats.chunks_scanned,
                stats.rows_scanned,
                stats.rows_filtered,
                self.sealed_indexes.indexing().resource_ack()
            );
            result
        };

        self.fill_primary_keys(&mut result);
        Ok(result)
    }

    /// Search as of `query_timestamp`.
    ///
    /// Captures both barriers once, excludes deleted rows and rows newer than
    /// `query_timestamp` or past the insert barrier, then runs
    /// [`vector_search`](Self::vector_search).
    pub fn search(
        &self,
        field_id: FieldId,
        queries: &[f32],
        query_count: usize,
        params: &SearchParams,
        query_timestamp: Timestamp,
    ) -> Result<QueryResult> {
        let barriers = self.capture_barriers();
        let snapshot = self.get_deleted_bitmap(
            barriers.delete_barrier,
            query_timestamp,
            barriers.insert_barrier,
            true,
        )?;
        let filter = self.timestamp_filter(&snapshot, barriers.insert_barrier, query_timestamp);
        self.vector_search(
            field_id,
            queries,
            query_count,
            BitsetView::new(&filter),
            params,
        )
    }

    /// Visibility snapshot covering the first `delete_barrier` delete entries
    /// over the first `insert_barrier` rows.
    ///
    /// Both barriers must lie within the acked part of their log. The result
    /// is derived from the most recently used cached snapshot, forward
    /// derivations are cached and backward ones are not. With `force` unset
    /// a cached snapshot at the same delete barrier is returned even when it
    /// spans a different number of rows.
    pub fn get_deleted_bitmap(
        &self,
        delete_barrier: i64,
        query_timestamp: Timestamp,
        insert_barrier: i64,
        force: bool,
    ) -> Result<Arc<DeletedBitmap>> {
        let delete_ack = self.deleted_record.ack();
        if !(0..=delete_ack).contains(&delete_barrier) {
            return Err(SegcoreError::invalid_argument(format!(
                "delete barrier {delete_barrier} outside acked range [0, {delete_ack}]"
            )));
        }
        let insert_ack = self.insert_record.ack();
        if !(0..=insert_ack).contains(&insert_barrier) {
            return Err(SegcoreError::invalid_argument(format!(
                "insert barrier {insert_barrier} outside acked range [0, {insert_ack}]"
            )));
        }

        let cache = &self.deleted_record.cache;
        let old = cache.most_recent();
        if (!force || old.len() as i64 == insert_barrier)
            && old.delete_barrier() == delete_barrier
        {
            return Ok(old);
        }

        let mut current = old.derive(delete_barrier, insert_barrier);
        if delete_barrier < old.delete_barrier() {
            let mut cleared = 0;
            for index in delete_barrier..old.delete_barrier() {
                if let Some(offset) = self.resolve_entry(index, insert_barrier, query_timestamp) {
                    current.clear(offset);
                    cleared += 1;
                }
            }
            debug!(
                "backward bitmap derivation {} -> {delete_barrier} over {insert_barrier} rows: {cleared} cleared",
                old.delete_barrier()
            );
            return Ok(Arc::new(current));
        }

        let mut applied = 0;
        for index in old.delete_barrier()..delete_barrier {
            if let Some(offset) = self.resolve_entry(index, insert_barrier, query_timestamp) {
                current.set(offset);
                applied += 1;
            }
        }
        debug!(
            "forward bitmap derivation {} -> {delete_barrier} over {insert_barrier} rows: {applied} applied",
            old.delete_barrier()
        );

        let current = Arc::new(current);
        if !cache.insert(current.clone()) {
            debug!("bitmap cache already advanced past {delete_barrier}");
        }
        Ok(current)
    }

    /// Estimated bytes held by both logs, in whole chunks.
    pub fn memory_usage_bytes(&self) -> i64 {
        let chunk_size = self.config.chunk_size as i64;
        let align = |rows: i64| (rows.max(0) + chunk_size - 1) / chunk_size * chunk_size;

        let insert_row_bytes = self.schema.total_sizeof() as i64 + INSERT_ROW_OVERHEAD_BYTES;
        align(self.insert_record.reserved()) * insert_row_bytes
            + align(self.deleted_record.reserved()) * DELETE_ROW_BYTES
    }

    /// Number of chunks holding acked rows.
    pub fn num_chunk_data(&self) -> usize {
        self.insert_record.num_chunk()
    }

    /// Raw bytes of one chunk of `field`, limited to acked rows.
    pub fn chunk_data(&self, field: FieldOffset, chunk_id: usize) -> Option<ChunkView<u8>> {
        self.insert_record.read_chunk(field, chunk_id)
    }

    pub fn state(&self) -> SegmentState {
        SegmentState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SegmentState::Closed
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Acked insert rows.
    pub fn row_count(&self) -> i64 {
        self.insert_record.ack()
    }

    /// Acked delete-log entries.
    pub fn deleted_count(&self) -> i64 {
        self.deleted_record.ack()
    }

    pub fn reserved_rows(&self) -> i64 {
        self.insert_record.reserved()
    }

    pub fn primary_key_at(&self, offset: i64) -> Option<i64> {
        self.insert_record.primary_key_at(offset)
    }

    pub fn timestamp_at(&self, offset: i64) -> Option<Timestamp> {
        self.insert_record.timestamp_at(offset)
    }

    /// Insert offsets holding `primary_key`, in publication order.
    pub fn offsets_of(&self, primary_key: i64) -> Vec<i64> {
        self.pk_index.offsets(primary_key)
    }

    /// Current ack watermarks of both logs.
    pub fn capture_barriers(&self) -> Barriers {
        Barriers {
            insert_barrier: self.insert_record.ack(),
            delete_barrier: self.deleted_record.ack(),
        }
    }

    pub fn insert_record(&self) -> &InsertRecord {
        &self.insert_record
    }

    pub fn deleted_record(&self) -> &DeletedRecord {
        &self.deleted_record
    }

    pub fn sealed_indexes(&self) -> &SealedIndexRegistry {
        &self.sealed_indexes
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state() {
            SegmentState::Open => Ok(()),
            SegmentState::Closed => Err(SegcoreError::SegmentClosed),
        }
    }

    /// Validate `[begin, begin + size)` against `reserved` and return its length.
    fn check_range(&self, begin: i64, size: i64, reserved: i64, log: &str) -> Result<usize> {
        if begin < 0 || size < 0 || begin.saturating_add(size) > reserved {
            return Err(SegcoreError::invalid_argument(format!(
                "{log} range [{begin}, {}) outside reserved space [0, {reserved})",
                begin.saturating_add(size)
            )));
        }
        Ok(size as usize)
    }

    /// Insert offset that delete entry `index` applies to, if any.
    fn resolve_entry(
        &self,
        index: i64,
        insert_barrier: i64,
        query_timestamp: Timestamp,
    ) -> Option<i64> {
        let entry = self.deleted_record.entry(index)?;
        self.pk_index.with_offsets(entry.primary_key, |candidates| {
            resolve_delete_target(
                candidates,
                insert_barrier,
                query_timestamp,
                entry.timestamp,
                |offset| self.insert_record.timestamp_at(offset),
            )
        })
    }

    /// `snapshot` widened to the current ack, additionally excluding rows
    /// at or past `insert_barrier` and rows newer than `query_timestamp`.
    fn timestamp_filter(
        &self,
        snapshot: &DeletedBitmap,
        insert_barrier: i64,
        query_timestamp: Timestamp,
    ) -> BitVec {
        let barrier = insert_barrier.max(0) as usize;
        let len = (self.insert_record.ack().max(0) as usize).max(barrier);
        let mut filter = BitVec::from_elem(len, true);
        for offset in 0..barrier {
            filter.set(offset, snapshot.is_deleted(offset as i64));
        }

        let size_per_chunk = self.insert_record.size_per_chunk();
        for chunk_id in 0..barrier.div_ceil(size_per_chunk) {
            let Some(view) = self.insert_record.read_timestamp_chunk(chunk_id) else {
                break;
            };
            let chunk_begin = chunk_id * size_per_chunk;
            for (row, &timestamp) in view.as_slice().iter().enumerate() {
                let offset = chunk_begin + row;
                if offset < barrier && timestamp > query_timestamp {
                    filter.set(offset, true);
                }
            }
        }
        filter
    }

    fn fill_primary_keys(&self, result: &mut QueryResult) {
        for (slot, &offset) in result.seg_offsets.iter().enumerate() {
            if offset >= 0
                && let Some(pk) = self.insert_record.primary_key_at(offset)
            {
                result.primary_keys[slot] = pk;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FlatIndex, METRIC_TYPE_KEY};
    use crate::search::DistanceMetric;

    fn scalar_segment(chunk_size: usize) -> SegmentGrowing {
        let schema = Schema::builder()
            .add_field(100, "value", DataType::Int32)
            .build()
            .unwrap();
        SegmentGrowing::new(
            Arc::new(schema),
            SegmentConfig::default().with_chunk_size(chunk_size),
        )
        .unwrap()
    }

    fn encode_i32(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn insert_i32(segment: &SegmentGrowing, keys: &[i64], timestamps: &[Timestamp]) {
        let values: Vec<i32> = keys.iter().map(|&k| k as i32 * 10).collect();
        let bytes = encode_i32(&values);
        let size = keys.len() as i64;
        let begin = segment.pre_insert(size);
        segment
            .insert(begin, size, keys, timestamps, &RowBatch::new(&bytes, 4, keys.len()))
            .unwrap();
    }

    fn delete(segment: &SegmentGrowing, keys: &[i64], timestamps: &[Timestamp]) {
        let size = keys.len() as i64;
        let begin = segment.pre_delete(size);
        segment.delete(begin, size, keys, timestamps).unwrap();
    }

    #[test]
    fn test_insert_sorts_rows() {
        let segment = scalar_segment(4);
        insert_i32(&segment, &[3, 1, 2], &[30, 10, 20]);

        assert_eq!(segment.row_count(), 3);
        assert_eq!(segment.primary_key_at(0), Some(1));
        assert_eq!(segment.timestamp_at(2), Some(30));
        let chunk = segment.chunk_data(FieldOffset(0), 0).unwrap();
        assert_eq!(chunk.as_slice(), encode_i32(&[10, 20, 30]).as_slice());
        assert_eq!(segment.offsets_of(3), vec![2]);
    }

    #[test]
    fn test_schema_mismatch_writes_nothing() {
        let segment = scalar_segment(4);
        let begin = segment.pre_insert(2);
        let bytes = [0u8; 16];
        let err = segment
            .insert(begin, 2, &[1, 2], &[1, 2], &RowBatch::new(&bytes, 8, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            SegcoreError::SchemaMismatch {
                entity: 8,
                schema: 4
            }
        ));
        assert_eq!(segment.row_count(), 0);
        assert!(segment.offsets_of(1).is_empty());
        assert_eq!(segment.num_chunk_data(), 0);
    }

    #[test]
    fn test_range_and_length_checks() {
        let segment = scalar_segment(4);
        let bytes = encode_i32(&[1, 2]);
        let rows = RowBatch::new(&bytes, 4, 2);

        // nothing reserved yet
        assert!(matches!(
            segment.insert(0, 2, &[1, 2], &[1, 2], &rows),
            Err(SegcoreError::InvalidArgument(_))
        ));

        let begin = segment.pre_insert(2);
        assert!(segment.insert(begin, 2, &[1], &[1, 2], &rows).is_err());
        assert!(segment.insert(begin, -1, &[], &[], &rows).is_err());
        assert!(segment.delete(0, 1, &[1], &[1]).is_err());
        assert_eq!(segment.row_count(), 0);
    }

    #[test]
    fn test_close_requires_acked_writes() {
        let segment = scalar_segment(4);
        insert_i32(&segment, &[1], &[1]);
        let pending = segment.pre_delete(1);

        assert!(matches!(
            segment.close(),
            Err(SegcoreError::PendingWrites { log: "delete", .. })
        ));
        assert_eq!(segment.state(), SegmentState::Open);

        segment.delete(pending, 1, &[1], &[2]).unwrap();
        segment.close().unwrap();
        assert!(segment.is_closed());
        segment.close().unwrap();

        let begin = segment.pre_insert(1);
        let bytes = encode_i32(&[0]);
        assert!(matches!(
            segment.insert(begin, 1, &[9], &[9], &RowBatch::new(&bytes, 4, 1)),
            Err(SegcoreError::SegmentClosed)
        ));
        assert!(matches!(
            segment.delete(0, 0, &[], &[]),
            Err(SegcoreError::SegmentClosed)
        ));
    }

    #[test]
    fn test_barriers_validated() {
        let segment = scalar_segment(4);
        insert_i32(&segment, &[1, 2], &[1, 2]);
        assert!(segment.get_deleted_bitmap(1, 10, 2, true).is_err());
        assert!(segment.get_deleted_bitmap(0, 10, 3, true).is_err());
        assert!(segment.get_deleted_bitmap(-1, 10, 2, true).is_err());
        assert!(segment.get_deleted_bitmap(0, 10, 2, true).is_ok());
    }

    #[test]
    fn test_forward_derivation_is_cached() {
        let segment = scalar_segment(4);
        insert_i32(&segment, &[1, 2, 3], &[10, 20, 30]);
        delete(&segment, &[2], &[25]);

        let first = segment.get_deleted_bitmap(1, 26, 3, true).unwrap();
        assert_eq!(first.deleted_offsets(), vec![1]);
        let second = segment.get_deleted_bitmap(1, 26, 3, true).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_backward_derivation_starts_from_most_recent() {
        let segment = scalar_segment(4);
        insert_i32(&segment, &[1, 2, 3], &[10, 20, 30]);
        delete(&segment, &[3], &[35]);
        delete(&segment, &[1], &[40]);

        let first = segment.get_deleted_bitmap(1, 100, 3, true).unwrap();
        assert_eq!(first.deleted_offsets(), vec![2]);
        let latest = segment.get_deleted_bitmap(2, 100, 3, true).unwrap();
        assert_eq!(latest.deleted_offsets(), vec![0, 2]);

        // the snapshot cached at (1, 3) was built at ts 100; stepping back from
        // (2, 3) at ts 5 finds no row of key 1 old enough to clear
        let back = segment.get_deleted_bitmap(1, 5, 3, true).unwrap();
        assert_eq!(back.delete_barrier(), 1);
        assert_eq!(back.deleted_offsets(), vec![0, 2]);
        assert!(!Arc::ptr_eq(&back, &first));

        let cache = segment.deleted_record().cache();
        assert_eq!(cache.most_recent().delete_barrier(), 2);
        assert!(Arc::ptr_eq(&cache.most_recent(), &latest));
    }

    #[test]
    fn test_negative_reservation_claims_nothing() {
        let segment = scalar_segment(4);
        assert_eq!(segment.pre_insert(2), 0);
        assert_eq!(segment.pre_insert(-3), 2);
        assert_eq!(segment.reserved_rows(), 2);
        assert_eq!(segment.pre_insert(1), 2);

        assert_eq!(segment.pre_delete(-1), 0);
        assert_eq!(segment.pre_delete(1), 0);
        assert_eq!(segment.deleted_record().reserved(), 1);
    }

    #[test]
    fn test_unforced_lookup_returns_cached_width() {
        let segment = scalar_segment(4);
        insert_i32(&segment, &[1, 2], &[10, 20]);
        delete(&segment, &[1], &[15]);
        let cached = segment.get_deleted_bitmap(1, 100, 1, true).unwrap();
        assert_eq!(cached.len(), 1);

        let unforced = segment.get_deleted_bitmap(1, 100, 2, false).unwrap();
        assert!(Arc::ptr_eq(&cached, &unforced));

        let forced = segment.get_deleted_bitmap(1, 100, 2, true).unwrap();
        assert_eq!(forced.len(), 2);
        assert_eq!(forced.deleted_offsets(), vec![0]);
    }

    #[test]
    fn test_memory_usage_is_chunk_aligned() {
        let segment = scalar_segment(4);
        assert_eq!(segment.memory_usage_bytes(), 0);
        segment.pre_insert(5);
        segment.pre_delete(1);
        // 8 rows * (4 + 17) + 4 deletes * 32
        assert_eq!(segment.memory_usage_bytes(), 8 * 21 + 4 * 32);
    }

    #[test]
    fn test_load_index_checks() {
        let schema = Schema::builder()
            .add_field(100, "value", DataType::Int32)
            .add_vector_field(101, "embedding", 2, DistanceMetric::Euclidean)
            .build()
            .unwrap();
        let segment = SegmentGrowing::new(Arc::new(schema), SegmentConfig::default()).unwrap();
        let index = Arc::new(FlatIndex::new(2, vec![0.0, 0.0]).unwrap());

        let err = segment
            .load_index(LoadIndexInfo::new(FieldId(101), index.clone()))
            .unwrap_err();
        assert!(matches!(err, SegcoreError::MissingMetricType));

        let err = segment
            .load_index(LoadIndexInfo::new(FieldId(7), index.clone()).with_param(METRIC_TYPE_KEY, "L2"))
            .unwrap_err();
        assert!(matches!(err, SegcoreError::FieldNotFound(_)));

        let err = segment
            .load_index(LoadIndexInfo::new(FieldId(100), index.clone()).with_param(METRIC_TYPE_KEY, "L2"))
            .unwrap_err();
        assert!(matches!(err, SegcoreError::Index(_)));

        let wrong_dim = Arc::new(FlatIndex::new(3, vec![0.0; 3]).unwrap());
        assert!(
            segment
                .load_index(LoadIndexInfo::new(FieldId(101), wrong_dim).with_param(METRIC_TYPE_KEY, "L2"))
                .is_err()
        );

        segment
            .load_index(LoadIndexInfo::new(FieldId(101), index).with_param(METRIC_TYPE_KEY, "L2"))
            .unwrap();
        assert!(segment.sealed_indexes().is_ready(FieldOffset(1)));
        assert!(segment.drop_index(FieldId(101)).unwrap());
        assert!(!segment.drop_index(FieldId(101)).unwrap());
    }

    #[test]
    fn test_resource_ack_counts_full_chunks() {
        let segment = scalar_segment(4);
        insert_i32(&segment, &[1, 2, 3, 4, 5], &[1, 2, 3, 4, 5]);
        assert_eq!(segment.sealed_indexes().indexing().resource_ack(), 1);
        assert_eq!(segment.num_chunk_data(), 2);
    }
}
