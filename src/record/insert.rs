//! Insert log: columnar rows of a growing segment.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::{Result, SegcoreError};
use crate::schema::{FieldOffset, Schema};
use crate::storage::{AckResponder, ChunkView, ConcurrentVector};
use crate::Timestamp;

/// Columnar storage of every inserted row plus its reservation state.
///
/// `reserved` is the next free offset, advanced by [`InsertRecord::reserve`].
/// The ack watermark never exceeds it, and only offsets below the watermark
/// are exposed through [`InsertRecord::read_chunk`].
#[derive(Debug)]
pub struct InsertRecord {
    reserved: AtomicI64,
    pub(crate) ack_responder: AckResponder,
    pub(crate) timestamps: ConcurrentVector<Timestamp>,
    pub(crate) primary_keys: ConcurrentVector<i64>,
    fields: Vec<ConcurrentVector<u8>>,
    size_per_chunk: usize,
}

impl InsertRecord {
    pub fn new(schema: &Schema, size_per_chunk: usize) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|field| ConcurrentVector::new(field.size_of(), size_per_chunk))
            .collect();
        Self {
            reserved: AtomicI64::new(0),
            ack_responder: AckResponder::new(),
            timestamps: ConcurrentVector::new(1, size_per_chunk),
            primary_keys: ConcurrentVector::new(1, size_per_chunk),
            fields,
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

    /// Copy `rows` rows of raw field bytes into `field` starting at `begin`.
    pub fn write_field(
        &self,
        field: FieldOffset,
        begin: usize,
        bytes: &[u8],
        rows: usize,
    ) -> Result<()> {
        self.field_column(field)?.set_data(begin, bytes, rows)
    }

    /// Read view of one chunk of `field`, limited to acked rows.
    pub fn read_chunk(&self, field: FieldOffset, chunk_id: usize) -> Option<ChunkView<u8>> {
        let rows = self.acked_rows_in_chunk(chunk_id)?;
        self.fields.get(field.0)?.chunk(chunk_id, rows)
    }

    /// Read view of one chunk of the timestamp column, limited to acked rows.
    pub fn read_timestamp_chunk(&self, chunk_id: usize) -> Option<ChunkView<Timestamp>> {
        let rows = self.acked_rows_in_chunk(chunk_id)?;
        self.timestamps.chunk(chunk_id, rows)
    }

    /// Number of chunks holding acked rows.
    pub fn num_chunk(&self) -> usize {
        (self.ack().max(0) as usize).div_ceil(self.size_per_chunk)
    }

    pub fn size_per_chunk(&self) -> usize {
        self.size_per_chunk
    }

    pub fn timestamp_at(&self, offset: i64) -> Option<Timestamp> {
        if offset < 0 || offset >= self.ack() {
            return None;
        }
        self.timestamps.get_scalar(offset as usize)
    }

    pub fn primary_key_at(&self, offset: i64) -> Option<i64> {
        if offset < 0 || offset >= self.ack() {
            return None;
        }
        self.primary_keys.get_scalar(offset as usize)
    }

    pub(crate) fn field_column(&self, field: FieldOffset) -> Result<&ConcurrentVector<u8>> {
        self.fields
            .get(field.0)
            .ok_or_else(|| SegcoreError::field_not_found(format!("field offset {field}")))
    }

    fn acked_rows_in_chunk(&self, chunk_id: usize) -> Option<usize> {
        let ack = self.ack().max(0) as usize;
        let chunk_begin = chunk_id * self.size_per_chunk;
        if chunk_begin >= ack {
            return None;
        }
        Some((ack - chunk_begin).min(self.size_per_chunk))
    }
}
