//! Error types for segcore.
//!
//! All fallible operations return [`SegcoreError`] through the crate-wide
//! [`Result`] alias.
//!
//! # Examples
//!
//! ```
//! use segcore::error::{Result, SegcoreError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SegcoreError::invalid_argument("size must be positive"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for segment operations.
#[derive(Error, Debug)]
pub enum SegcoreError {
    /// Row byte length disagrees with the schema's total row size.
    #[error("Schema mismatch: entity length = {entity}, schema length = {schema}")]
    SchemaMismatch { entity: usize, schema: usize },

    /// An index was loaded without a `metric_type` parameter.
    #[error("Missing metric type: index params must contain 'metric_type'")]
    MissingMetricType,

    /// Close was attempted while reservations are still unacknowledged.
    #[error("Pending writes: {log} log reserved {reserved} rows but only {acked} are acked")]
    PendingWrites {
        log: &'static str,
        reserved: i64,
        acked: i64,
    },

    /// The segment no longer accepts mutations.
    #[error("Segment is closed")]
    SegmentClosed,

    /// Field lookup failed.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Schema definition errors
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid argument passed by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors (config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors raised by external index implementations
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SegcoreError.
pub type Result<T> = std::result::Result<T, SegcoreError>;

impl SegcoreError {
    /// Create a new schema mismatch error.
    pub fn schema_mismatch(entity: usize, schema: usize) -> Self {
        SegcoreError::SchemaMismatch { entity, schema }
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        SegcoreError::Schema(msg.into())
    }

    /// Create a new field-not-found error.
    pub fn field_not_found<S: Into<String>>(msg: S) -> Self {
        SegcoreError::FieldNotFound(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SegcoreError::InvalidArgument(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        SegcoreError::Index(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SegcoreError::Config(msg.into())
    }

    /// Returns true for errors that signal misuse of the reserve/commit protocol.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            SegcoreError::PendingWrites { .. } | SegcoreError::MissingMetricType
        )
    }
}
