//! Brute-force search over the growing column store.

use byteorder::{ByteOrder, LittleEndian};
use rayon::prelude::*;

use crate::error::{Result, SegcoreError};
use crate::record::InsertRecord;
use crate::schema::FieldOffset;
use crate::search::result::{QueryResult, TopK};
use crate::search::{BitsetView, DistanceMetric};

/// What a growing scan covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrowingScanStats {
    pub chunks_scanned: usize,
    pub rows_scanned: usize,
    pub rows_filtered: usize,
}

/// Exact top-k over every acked row of a float vector field.
///
/// `queries` holds `query_count` vectors of `dim` values, row-major. Rows
/// excluded by `filter` never reach the collectors.
#[allow(clippy::too_many_arguments)]
pub fn search_on_growing(
    record: &InsertRecord,
    field: FieldOffset,
    dim: usize,
    metric: DistanceMetric,
    queries: &[f32],
    query_count: usize,
    top_k: usize,
    filter: BitsetView<'_>,
) -> Result<(QueryResult, GrowingScanStats)> {
    if queries.len() != query_count * dim {
        return Err(SegcoreError::invalid_argument(format!(
            "expected {query_count} query vectors of dimension {dim}, got {} values",
            queries.len()
        )));
    }

    let mut collectors: Vec<TopK> = (0..query_count).map(|_| TopK::new(top_k)).collect();
    let mut stats = GrowingScanStats::default();
    let size_per_chunk = record.size_per_chunk();
    let mut vectors = Vec::new();

    for chunk_id in 0..record.num_chunk() {
        let Some(view) = record.read_chunk(field, chunk_id) else {
            break;
        };
        vectors.resize(view.len() * dim, 0.0f32);
        LittleEndian::read_f32_into(view.as_slice(), &mut vectors);
        drop(view);

        let chunk_begin = chunk_id * size_per_chunk;
        let live: Vec<usize> = (0..vectors.len() / dim)
            .filter(|row| !filter.is_excluded(chunk_begin + row))
            .collect();
        stats.chunks_scanned += 1;
        stats.rows_scanned += vectors.len() / dim;
        stats.rows_filtered += vectors.len() / dim - live.len();

        collectors
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(query_index, collector)| -> Result<()> {
                let query = &queries[query_index * dim..(query_index + 1) * dim];
                for &row in &live {
                    let vector = &vectors[row * dim..(row + 1) * dim];
                    let distance = metric.distance(query, vector)?;
                    collector.push(distance, (chunk_begin + row) as i64);
                }
                Ok(())
            })?;
    }

    Ok((QueryResult::from_collectors(top_k, collectors), stats))
}
