//! Insert and delete logs of a growing segment.
//!
//! Both logs are append-only and follow the same two-phase protocol: a
//! writer reserves a range with an atomic bump of `reserved`, fills it, then
//! acknowledges it. Readers only trust offsets below the ack watermark.
//!
//! The delete log also owns the [`BitmapCache`] of visibility snapshots.

pub mod bitmap;
pub mod deleted;
pub mod insert;

pub use self::bitmap::{BitmapCache, DeletedBitmap};
pub use self::deleted::{DeleteEntry, DeletedRecord};
pub use self::insert::InsertRecord;
