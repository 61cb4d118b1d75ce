//! A hierarchical time-series store addressed by three-part path keys.
//!
//! Every data point lives at `id/type/timestamp`: `id` names the series
//! owner, `type` a sub-series under it, and `timestamp` an epoch-millisecond
//! instant unique within the pair. Selections address the store with
//! glob patterns on the `id` and `type` levels and inclusive bounds on the
//! timestamp level.
//!
//! # Architecture
//!
//! Three leaf components feed the engine:
//!
//! - [`key`] — composes and splits path keys.
//! - [`pattern`] — compiles glob patterns into anchored [`KeyMatcher`]s
//!   usable as store predicates.
//! - [`timestamp`] — normalizes heterogeneous time inputs (expressions,
//!   epoch integers, calendar dates) into epoch milliseconds.
//!
//! [`SeriesEngine`] combines them into list, read, bulk-replace, and delete
//! operations over an abstract [`DocumentStore`](common::DocumentStore).
//! Bulk replace is delete-then-insert: the selected range is removed first,
//! so a replace never leaves stale survivors behind.
//!
//! # Example
//!
//! ```ignore
//! use series::{Config, Selection, SeriesEngine};
//!
//! let engine = SeriesEngine::open(&Config::default())?;
//!
//! // ingest a body, replacing everything under the (unbounded) selection
//! engine.replace_range(&body, &Selection::default()).await?;
//!
//! // read one sub-series from 1.5s onward
//! let data = engine
//!     .read_range(&Selection {
//!         id_pattern: Some("sensorA".into()),
//!         type_pattern: Some("tempC".into()),
//!         start: Some("1500".into()),
//!         ..Default::default()
//!     })
//!     .await?;
//! ```

mod config;
mod engine;
mod error;
pub mod key;
mod model;
pub mod pattern;
mod storage;
pub mod timestamp;

pub use config::Config;
pub use engine::SeriesEngine;
pub use error::{BatchItemError, Error, Result};
pub use model::{DataPoint, ReplaceSummary, Selection, SeriesBody, TypeListing};
pub use pattern::KeyMatcher;
