//! Error types for the series engine.
//!
//! Parsing and pattern-compilation failures are detected before any mutation
//! is attempted and abort the whole operation. Insert failures inside a
//! replace batch are per-item and aggregated into
//! [`Error::PartialBatchFailure`]; a backend failure during the deletion
//! stage surfaces as [`Error::Store`] before any insert runs.

use thiserror::Error;

/// Result type alias for series engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A path key could not be split into `id/type/timestamp`.
    #[error("malformed key `{key}`: {reason}")]
    MalformedKey { key: String, reason: String },

    /// A glob pattern could not be compiled.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// All three timestamp parsing stages failed.
    ///
    /// Carries the error from each stage so callers can see why every
    /// interpretation of the input was rejected.
    #[error(
        "unparseable timestamp `{input}` (expression: {expression}; integer: {integer}; date: {date})"
    )]
    UnparseableTimestamp {
        input: String,
        expression: String,
        integer: String,
        date: String,
    },

    /// Opaque Document Store failure.
    #[error("store error: {0}")]
    Store(String),

    /// One or more inserts failed inside a replace batch.
    ///
    /// Sibling inserts are not rolled back; each failure names the
    /// `series/id/type/timestamp` path of the point it belongs to.
    #[error("{} insert failure(s) in replace batch", failures.len())]
    PartialBatchFailure { failures: Vec<BatchItemError> },
}

/// A single failed insert within a replace batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemError {
    /// Path of the failed point, `series/id/type/timestamp`.
    pub path: String,
    /// The underlying store failure.
    pub cause: String,
}
