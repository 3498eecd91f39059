//! The growing segment and its supporting types.
//!
//! A [`SegmentGrowing`] accepts rows and deletes through a two-phase
//! reserve/commit protocol, serves visibility snapshots for any pair of
//! barriers, and routes vector searches either to a loaded sealed index or to
//! a brute-force scan of its own columns.

pub mod growing;
pub mod row_batch;
pub mod visibility;

pub use self::growing::SegmentGrowing;
pub use self::row_batch::RowBatch;
pub use self::visibility::resolve_delete_target;

use std::fmt;

/// Lifecycle of a segment. Only `Open` segments accept writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SegmentState {
    Open = 0,
    Closed = 1,
}

impl SegmentState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => SegmentState::Open,
            _ => SegmentState::Closed,
        }
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentState::Open => write!(f, "open"),
            SegmentState::Closed => write!(f, "closed"),
        }
    }
}

/// Ack watermarks of both logs captured at one instant.
///
/// Feeding these into [`SegmentGrowing::get_deleted_bitmap`] gives a snapshot
/// that stays consistent while writers continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Barriers {
    pub insert_barrier: i64,
    pub delete_barrier: i64,
}
