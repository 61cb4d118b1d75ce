//! Core data types for the series engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::key;

/// Nested series payload: `id -> type -> timestamp -> value`.
///
/// This is the body shape of bulk replace requests and the result shape of
/// range reads. In JSON the timestamp keys are strings; serde converts them
/// to and from `i64` map keys. Duplicate timestamps cannot survive the map
/// structure, so the last occurrence in a decoded body wins.
pub type SeriesBody = BTreeMap<String, BTreeMap<String, BTreeMap<i64, f64>>>;

/// Distinct types grouped by id, as returned by
/// [`SeriesEngine::list_types`](crate::SeriesEngine::list_types).
pub type TypeListing = BTreeMap<String, BTreeSet<String>>;

/// A single stored data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Epoch milliseconds, unique within `(id, type)`.
    pub timestamp: i64,
    pub value: f64,
}

impl DataPoint {
    pub fn new(
        id: impl Into<String>,
        type_name: impl Into<String>,
        timestamp: i64,
        value: f64,
    ) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            timestamp,
            value,
        }
    }

    /// The composed store key for this point.
    pub fn key(&self) -> String {
        key::compose(&self.id, &self.type_name, self.timestamp)
    }
}

/// Ephemeral selection over the store: optional glob patterns for the `id`
/// and `type` levels plus optional raw time-bound expressions.
///
/// An absent pattern means "match every segment"; an absent bound means
/// "unbounded". The time bounds are raw strings and go through the
/// timestamp parser when the selection is evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub id_pattern: Option<String>,
    pub type_pattern: Option<String>,
    pub start: Option<String>,
    pub stop: Option<String>,
}

/// Outcome of a successful [`replace_range`](crate::SeriesEngine::replace_range).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Data points removed by the deletion stage.
    pub deleted: u64,
    /// Data points inserted from the body.
    pub inserted: usize,
}
