//! Exact (brute force) index over a dense matrix.

use rayon::prelude::*;

use crate::error::{Result, SegcoreError};
use crate::index::sealed::VectorIndex;
use crate::search::result::{QueryResult, TopK};
use crate::search::{BitsetView, DistanceMetric, SearchParams};

/// Flat index that performs exact (brute force) search.
///
/// Row `i` of the matrix is segment offset `i`.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Create a flat index from `vectors`, row-major with `dimension` values per row.
    pub fn new(dimension: usize, vectors: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(SegcoreError::index("dimension must be positive"));
        }
        if vectors.len() % dimension != 0 {
            return Err(SegcoreError::index(format!(
                "{} values do not form rows of dimension {dimension}",
                vectors.len()
            )));
        }
        Ok(Self { dimension, vectors })
    }

    fn row(&self, offset: usize) -> &[f32] {
        &self.vectors[offset * self.dimension..(offset + 1) * self.dimension]
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn row_count(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    fn search(
        &self,
        queries: &[f32],
        query_count: usize,
        metric: DistanceMetric,
        params: &SearchParams,
        filter: BitsetView<'_>,
    ) -> Result<QueryResult> {
        if queries.len() != query_count * self.dimension {
            return Err(SegcoreError::invalid_argument(format!(
                "expected {query_count} query vectors of dimension {}, got {} values",
                self.dimension,
                queries.len()
            )));
        }

        let collectors = queries
            .par_chunks(self.dimension)
            .map(|query| -> Result<TopK> {
                let mut collector = TopK::new(params.top_k);
                for offset in 0..self.row_count() {
                    if filter.is_excluded(offset) {
                        continue;
                    }
                    collector.push(metric.distance(query, self.row(offset))?, offset as i64);
                }
                Ok(collector)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryResult::from_collectors(params.top_k, collectors))
    }
}
