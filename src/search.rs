//! Vector search over a segment.
//!
//! - `distance`: metrics, smaller distance is closer
//! - `params`: per-request parameters
//! - `bitset`: row filter handed to every searcher
//! - `result`: ranked output and top-k collection
//! - `growing`: brute-force scan of unindexed column data

pub mod bitset;
pub mod distance;
pub mod growing;
pub mod params;
pub mod result;

pub use self::bitset::BitsetView;
pub use self::distance::DistanceMetric;
pub use self::growing::{GrowingScanStats, search_on_growing};
pub use self::params::SearchParams;
pub use self::result::{QueryResult, SearchHit, TopK};
