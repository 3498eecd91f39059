//! Column storage primitives shared by the insert and delete logs.
//!
//! - [`ConcurrentVector`]: chunked buffer written by offset
//! - [`AckResponder`]: watermark over completed row ranges

pub mod ack_responder;
pub mod concurrent_vector;

pub use self::ack_responder::AckResponder;
pub use self::concurrent_vector::{ChunkView, ConcurrentVector};
