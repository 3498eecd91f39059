//! Indexes maintained alongside a growing segment.
//!
//! - `primary_key`: primary key to insert offsets
//! - `sealed`: externally built vector indexes, one per field
//! - `flat`: exact reference implementation of [`VectorIndex`]

pub mod flat;
pub mod primary_key;
pub mod sealed;

pub use self::flat::FlatIndex;
pub use self::primary_key::PrimaryKeyIndex;
pub use self::sealed::{
    IndexingRecord, LoadIndexInfo, METRIC_TYPE_KEY, SealedIndexEntry, SealedIndexRegistry,
    VectorIndex,
};
