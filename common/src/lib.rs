//! Shared building blocks for the series workspace.
//!
//! This crate defines the Document Store seam: the abstract persistence
//! contract the series engine talks to, together with the bundled in-memory
//! backend, configuration types, and the clock abstraction used for
//! deterministic time in tests.

pub mod clock;
pub mod storage;

pub use clock::{Clock, MockClock, SystemClock};
pub use storage::{
    Collection, Document, DocumentStore, Filter, KeyPredicate, StoreConfig, StoreError,
    StoreResult, TimeFilter, create_store,
};
