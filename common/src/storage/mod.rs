//! The Document Store seam.
//!
//! The series engine persists three kinds of documents (id markers, type
//! markers, data points) through the [`DocumentStore`] trait. Backends are
//! handed opaque key predicates (compiled by the engine's pattern compiler)
//! and an optional timestamp range; they never interpret key patterns
//! themselves, which keeps backend substitution possible without touching
//! the core.

pub mod config;
pub mod factory;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use config::StoreConfig;
pub use factory::create_store;
pub use memory::MemoryStore;

/// Error type for Document Store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Failure reported by the storage backend.
    #[error("store backend error: {0}")]
    Backend(String),

    /// Invariant violation inside the store layer itself.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Result type alias for Document Store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The persisted collections, one per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Bare `id` marker documents.
    Ids,
    /// Bare `id/type` marker documents.
    Types,
    /// `id/type/timestamp` data points.
    Data,
}

/// A stored document, keyed by its composed path key.
///
/// Marker documents (collections [`Collection::Ids`] and
/// [`Collection::Types`]) carry only a key; data points also carry their
/// timestamp and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The composed path key (`id`, `id/type`, or `id/type/timestamp`).
    pub key: String,
    /// Epoch milliseconds; present only for data points.
    pub timestamp: Option<i64>,
    /// The recorded value; present only for data points.
    pub value: Option<f64>,
}

impl Document {
    /// Creates a marker document carrying only a key.
    pub fn marker(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            timestamp: None,
            value: None,
        }
    }

    /// Creates a data-point document.
    pub fn point(key: impl Into<String>, timestamp: i64, value: f64) -> Self {
        Self {
            key: key.into(),
            timestamp: Some(timestamp),
            value: Some(value),
        }
    }
}

/// An opaque key predicate handed to the store by the engine.
///
/// Implementations are compiled pattern matchers; the store only ever calls
/// [`KeyPredicate::matches`] against literal key strings.
pub trait KeyPredicate: Send + Sync {
    fn matches(&self, key: &str) -> bool;
}

/// Inclusive timestamp bounds applied to data-point documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeFilter {
    pub gte: Option<i64>,
    pub lte: Option<i64>,
}

impl TimeFilter {
    /// True when the given timestamp falls within the bounds.
    pub fn contains(&self, timestamp: i64) -> bool {
        self.gte.is_none_or(|gte| timestamp >= gte)
            && self.lte.is_none_or(|lte| timestamp <= lte)
    }
}

/// A selection over one collection: an optional key predicate plus an
/// optional timestamp range.
#[derive(Clone, Default)]
pub struct Filter {
    /// Key predicate; absent means every key matches.
    pub key: Option<Arc<dyn KeyPredicate>>,
    /// Timestamp bounds; absent means unbounded.
    pub time: Option<TimeFilter>,
}

impl Filter {
    /// Matches every document in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches documents whose key satisfies the predicate.
    pub fn matching(predicate: Arc<dyn KeyPredicate>) -> Self {
        Self {
            key: Some(predicate),
            time: None,
        }
    }

    /// Adds inclusive timestamp bounds to the selection.
    pub fn with_time(mut self, time: TimeFilter) -> Self {
        self.time = Some(time);
        self
    }

    /// Evaluates the filter against a single document.
    ///
    /// A document with no timestamp never satisfies a time-bounded filter;
    /// only data points carry timestamps, and time bounds are meaningless
    /// for marker documents.
    pub fn accepts(&self, document: &Document) -> bool {
        if let Some(predicate) = &self.key {
            if !predicate.matches(&document.key) {
                return false;
            }
        }
        match (&self.time, document.timestamp) {
            (None, _) => true,
            (Some(time), Some(ts)) => time.contains(ts),
            (Some(_), None) => false,
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("key", &self.key.as_ref().map(|_| "<predicate>"))
            .field("time", &self.time)
            .finish()
    }
}

/// Abstract persistence contract for the series engine.
///
/// Result sets are unordered; callers impose their own grouping. `upsert`
/// replaces whole documents by key, which is what gives the engine its
/// replace semantics for the composite primary key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns every document in the collection accepted by the filter.
    async fn find(&self, collection: Collection, filter: Filter) -> StoreResult<Vec<Document>>;

    /// Inserts or replaces a document by key.
    async fn upsert(&self, collection: Collection, document: Document) -> StoreResult<()>;

    /// Removes every document accepted by the filter; returns the count.
    async fn remove(&self, collection: Collection, filter: Filter) -> StoreResult<u64>;
}
