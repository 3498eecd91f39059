//! # Segcore
//!
//! The growing segment of a vector database: an append-only, columnar
//! segment that takes concurrent inserts and deletes while serving
//! point-in-time vector searches.
//!
//! ## Features
//!
//! - Two-phase reserve/commit inserts and deletes without a global lock
//! - Chunked column storage with an ack watermark per log
//! - Primary key index with lazy, barrier-scoped delete resolution
//! - Cached visibility bitmaps derived forward and backward
//! - Routing between loaded sealed indexes and brute-force search

pub mod config;
pub mod error;
pub mod index;
pub mod record;
pub mod schema;
pub mod search;
pub mod segment;
pub mod storage;

/// Logical timestamp attached to every insert and delete.
pub type Timestamp = u64;

pub use crate::config::SegmentConfig;
pub use crate::error::{Result, SegcoreError};
pub use crate::segment::{Barriers, RowBatch, SegmentGrowing, SegmentState};

pub mod prelude {
    pub use crate::config::SegmentConfig;
    pub use crate::error::{Result, SegcoreError};
    pub use crate::index::{FlatIndex, LoadIndexInfo, METRIC_TYPE_KEY, VectorIndex};
    pub use crate::schema::{DataType, FieldId, FieldOffset, Schema};
    pub use crate::search::{BitsetView, DistanceMetric, QueryResult, SearchParams};
    pub use crate::segment::{Barriers, RowBatch, SegmentGrowing, SegmentState};
    pub use crate::Timestamp;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
