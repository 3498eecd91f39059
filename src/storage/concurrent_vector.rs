//! Chunked, append-by-offset column buffer.
//!
//! A [`ConcurrentVector`] stores fixed-width rows in equally sized chunks.
//! Writers fill disjoint row ranges they reserved beforehand; readers get
//! chunk-granular read views. The chunk list only ever grows, and each chunk
//! carries its own lock so writers touching different chunks never contend.

use std::sync::Arc;

use parking_lot::lock_api::ArcRwLockReadGuard;
use parking_lot::{RawRwLock, RwLock};

use crate::error::{Result, SegcoreError};

type Chunk<T> = Arc<RwLock<Box<[T]>>>;

/// Column buffer split into chunks of `size_per_chunk` rows.
#[derive(Debug)]
pub struct ConcurrentVector<T> {
    elements_per_row: usize,
    size_per_chunk: usize,
    chunks: RwLock<Vec<Chunk<T>>>,
}

impl<T: Copy + Default> ConcurrentVector<T> {
    /// Create an empty column. `elements_per_row` is the number of `T` values
    /// making up one row (a vector dimension, a byte width, or 1 for scalars).
    pub fn new(elements_per_row: usize, size_per_chunk: usize) -> Self {
        Self {
            elements_per_row,
            size_per_chunk,
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub fn elements_per_row(&self) -> usize {
        self.elements_per_row
    }

    pub fn size_per_chunk(&self) -> usize {
        self.size_per_chunk
    }

    /// Number of allocated chunks.
    pub fn num_chunk(&self) -> usize {
        self.chunks.read().len()
    }

    /// Ensure chunks exist for rows `[0, rows)`.
    pub fn grow_to_at_least(&self, rows: usize) {
        let needed = rows.div_ceil(self.size_per_chunk);
        if self.chunks.read().len() >= needed {
            return;
        }
        let mut chunks = self.chunks.write();
        while chunks.len() < needed {
            let chunk = vec![T::default(); self.size_per_chunk * self.elements_per_row];
            chunks.push(Arc::new(RwLock::new(chunk.into_boxed_slice())));
        }
    }

    /// Copy `rows` rows from `source` starting at row `offset`.
    ///
    /// The caller owns `[offset, offset + rows)` exclusively; the range may
    /// span several chunks.
    pub fn set_data(&self, offset: usize, source: &[T], rows: usize) -> Result<()> {
        if source.len() != rows * self.elements_per_row {
            return Err(SegcoreError::invalid_argument(format!(
                "expected {} elements for {rows} rows, got {}",
                rows * self.elements_per_row,
                source.len()
            )));
        }
        if rows == 0 {
            return Ok(());
        }
        self.grow_to_at_least(offset + rows);

        let mut row = offset;
        let mut consumed = 0;
        while consumed < rows {
            let chunk_id = row / self.size_per_chunk;
            let chunk_row = row % self.size_per_chunk;
            let take = (self.size_per_chunk - chunk_row).min(rows - consumed);

            let chunk = self.chunks.read()[chunk_id].clone();
            let mut data = chunk.write();
            let dst_begin = chunk_row * self.elements_per_row;
            let src_begin = consumed * self.elements_per_row;
            let len = take * self.elements_per_row;
            data[dst_begin..dst_begin + len].copy_from_slice(&source[src_begin..src_begin + len]);

            row += take;
            consumed += take;
        }
        Ok(())
    }

    /// First element of one row; convenient for single-element columns.
    pub fn get_scalar(&self, row: usize) -> Option<T> {
        let chunk = self.chunk_handle(row / self.size_per_chunk)?;
        let data = chunk.read();
        Some(data[(row % self.size_per_chunk) * self.elements_per_row])
    }

    /// Read view over the first `valid_rows` rows of chunk `chunk_id`.
    pub fn chunk(&self, chunk_id: usize, valid_rows: usize) -> Option<ChunkView<T>> {
        let chunk = self.chunk_handle(chunk_id)?;
        Some(ChunkView {
            guard: chunk.read_arc(),
            elements_per_row: self.elements_per_row,
            rows: valid_rows.min(self.size_per_chunk),
        })
    }

    fn chunk_handle(&self, chunk_id: usize) -> Option<Chunk<T>> {
        self.chunks.read().get(chunk_id).cloned()
    }
}

/// Bounds-checked read view of one chunk.
///
/// The view keeps the chunk alive and blocks writers of that chunk only for
/// as long as it is held.
pub struct ChunkView<T> {
    guard: ArcRwLockReadGuard<RawRwLock, Box<[T]>>,
    elements_per_row: usize,
    rows: usize,
}

impl<T> ChunkView<T> {
    /// Number of readable rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn elements_per_row(&self) -> usize {
        self.elements_per_row
    }

    /// All readable elements, row-major.
    pub fn as_slice(&self) -> &[T] {
        &self.guard[..self.rows * self.elements_per_row]
    }

    /// Elements of row `index` within this chunk.
    pub fn row(&self, index: usize) -> Option<&[T]> {
        if index >= self.rows {
            return None;
        }
        let begin = index * self.elements_per_row;
        Some(&self.guard[begin..begin + self.elements_per_row])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.as_slice().chunks_exact(self.elements_per_row.max(1))
    }
}

impl<T> std::fmt::Debug for ChunkView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkView")
            .field("rows", &self.rows)
            .field("elements_per_row", &self.elements_per_row)
            .finish()
    }
}
