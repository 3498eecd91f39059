//! Segment configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegcoreError};

/// Default number of rows per column chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Default number of visibility snapshots kept in the bitmap cache.
pub const DEFAULT_BITMAP_CACHE_CAPACITY: usize = 8;

/// Tunables for a growing segment.
///
/// Both values are fixed for the lifetime of a segment: the chunk size decides
/// how column buffers are laid out and how memory is accounted, the cache
/// capacity bounds how many visibility snapshots stay resident.
///
/// ```
/// use segcore::config::SegmentConfig;
///
/// let config = SegmentConfig::from_json_str(r#"{ "chunk_size": 1024 }"#).unwrap();
/// assert_eq!(config.chunk_size, 1024);
/// assert_eq!(config.bitmap_cache_capacity, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Rows per column chunk.
    pub chunk_size: usize,

    /// Maximum number of cached visibility snapshots.
    pub bitmap_cache_capacity: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            bitmap_cache_capacity: DEFAULT_BITMAP_CACHE_CAPACITY,
        }
    }
}

impl SegmentConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SegmentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Set the number of rows per chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the visibility cache capacity.
    pub fn with_bitmap_cache_capacity(mut self, capacity: usize) -> Self {
        self.bitmap_cache_capacity = capacity;
        self
    }

    /// Check that every tunable is usable.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SegcoreError::invalid_config("chunk_size must be positive"));
        }
        if self.bitmap_cache_capacity == 0 {
            return Err(SegcoreError::invalid_config(
                "bitmap_cache_capacity must be positive",
            ));
        }
        Ok(())
    }
}
