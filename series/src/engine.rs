//! The series engine.
//!
//! Stateless orchestrator over the Document Store: compiles selection
//! patterns into key matchers, normalizes time-bound expressions, and runs
//! the list/read/replace/delete operations. Each call is independent;
//! matchers are recompiled per call and nothing is cached between
//! operations.

use std::sync::Arc;

use common::{create_store, Clock, DocumentStore, SystemClock, TimeFilter};
use futures::future::join_all;

use crate::config::Config;
use crate::error::{BatchItemError, Error, Result};
use crate::key;
use crate::model::{DataPoint, ReplaceSummary, Selection, SeriesBody, TypeListing};
use crate::pattern::{self, KeyMatcher};
use crate::storage::SeriesStorage;
use crate::timestamp;

/// Query and mutation engine for the path-keyed series store.
///
/// All methods take `&self`; the engine holds no mutable state and relies
/// on the Document Store for any serialization between concurrent calls.
pub struct SeriesEngine {
    storage: SeriesStorage,
    clock: Arc<dyn Clock>,
}

impl SeriesEngine {
    /// Creates an engine over an existing Document Store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates an engine with an explicit clock, used by tests to make
    /// `now`-relative expressions and default append times deterministic.
    pub fn with_clock(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: SeriesStorage::new(store),
            clock,
        }
    }

    /// Opens an engine with a store created from configuration.
    pub fn open(config: &Config) -> Result<Self> {
        let store = create_store(&config.store).map_err(|e| Error::Store(e.to_string()))?;
        Ok(Self::new(store))
    }

    /// Lists every known series id.
    ///
    /// Ids are witnessed by identifier markers, so an id with zero data
    /// points still appears here.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = self.storage.find_ids().await?;
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Lists distinct `(id, type)` pairs under an id pattern, grouped by id.
    ///
    /// An absent pattern matches every id.
    pub async fn list_types(&self, id_pattern: Option<&str>) -> Result<TypeListing> {
        let matcher = compile_prefix(id_pattern.unwrap_or(key::WILDCARD), None)?;
        let markers = self.storage.find_type_markers(matcher).await?;

        let mut listing = TypeListing::new();
        for marker in markers {
            let Some((id, type_name)) = marker.split_once(key::SEPARATOR) else {
                return Err(Error::MalformedKey {
                    key: marker,
                    reason: "type marker must have two segments".to_string(),
                });
            };
            listing
                .entry(id.to_string())
                .or_default()
                .insert(type_name.to_string());
        }
        Ok(listing)
    }

    /// Reads data points matching the selection, grouped
    /// `id -> type -> timestamp -> value`.
    ///
    /// Bounds are inclusive on both ends. Inverted bounds (`start > stop`)
    /// yield an empty body rather than an error: the range is well-defined,
    /// it just contains nothing.
    pub async fn read_range(&self, selection: &Selection) -> Result<SeriesBody> {
        let matcher = data_matcher(selection)?;
        let time = self.read_bounds(selection)?;
        let points = self.storage.find_data(matcher, time).await?;

        let mut body = SeriesBody::new();
        for point in points {
            body.entry(point.id)
                .or_default()
                .entry(point.type_name)
                .or_default()
                .insert(point.timestamp, point.value);
        }
        Ok(body)
    }

    /// Bulk replace: removes the selected range, then inserts the body's
    /// points that fall inside the selection.
    ///
    /// The deletion predicate widens absent patterns to `*` and, when
    /// `start` is absent, covers the whole prefix regardless of `stop`.
    /// Deletion always precedes insertion, so a key present in both the
    /// deleted range and the body ends up with only the new value.
    ///
    /// Body keys are validated and the selection is compiled before any
    /// mutation; a store failure during deletion aborts with
    /// [`Error::Store`] before any insert runs. Inserts then fan out
    /// independently and individual failures are aggregated into
    /// [`Error::PartialBatchFailure`] without blocking sibling inserts.
    /// A replace whose body contributes zero accepted points is a success.
    pub async fn replace_range(
        &self,
        body: &SeriesBody,
        selection: &Selection,
    ) -> Result<ReplaceSummary> {
        for (id, types) in body {
            key::validate_segment(id)?;
            for type_name in types.keys() {
                key::validate_segment(type_name)?;
            }
        }

        let delete_matcher = data_matcher(selection)?;
        let id_matcher = compile_optional(selection.id_pattern.as_deref())?;
        let type_matcher = compile_optional(selection.type_pattern.as_deref())?;
        let start = self.parse_bound(selection.start.as_deref())?;
        let stop = self.parse_bound(selection.stop.as_deref())?;
        let bounds = delete_bounds(start, stop);

        let deleted = self.storage.remove_data(delete_matcher, bounds).await?;
        tracing::debug!(deleted, "replace_range deletion stage complete");

        let accepted: Vec<DataPoint> = body
            .iter()
            .filter(|(id, _)| accepts(&id_matcher, id))
            .flat_map(|(id, types)| {
                types
                    .iter()
                    .filter(|(type_name, _)| accepts(&type_matcher, type_name))
                    .flat_map(move |(type_name, values)| {
                        values
                            .iter()
                            .filter(move |(timestamp, _)| in_bounds(**timestamp, start, stop))
                            .map(move |(timestamp, value)| {
                                DataPoint::new(id.clone(), type_name.clone(), *timestamp, *value)
                            })
                    })
            })
            .collect();

        let inserts = accepted.iter().map(|point| {
            let storage = self.storage.clone();
            async move {
                storage.upsert_point(point).await.err().map(|e| BatchItemError {
                    path: format!("series/{}/{}/{}", point.id, point.type_name, point.timestamp),
                    cause: e.to_string(),
                })
            }
        });
        let failures: Vec<BatchItemError> = join_all(inserts).await.into_iter().flatten().collect();

        if failures.is_empty() {
            Ok(ReplaceSummary {
                deleted,
                inserted: accepted.len(),
            })
        } else {
            Err(Error::PartialBatchFailure { failures })
        }
    }

    /// Deletes the selected range of data points; returns the count.
    ///
    /// Uses the same predicate construction as the deletion stage of
    /// [`replace_range`](Self::replace_range), including the inverted-bounds
    /// policy of [`read_range`](Self::read_range). A prefix-wide delete (no
    /// `start`) also drops the matching type markers so deleted sub-series
    /// stop appearing in listings; identifier markers survive until
    /// [`delete_series`](Self::delete_series).
    pub async fn delete_range(&self, selection: &Selection) -> Result<u64> {
        let matcher = data_matcher(selection)?;
        let start = self.parse_bound(selection.start.as_deref())?;
        let stop = self.parse_bound(selection.stop.as_deref())?;
        let bounds = delete_bounds(start, stop);
        let unbounded = bounds.is_none();

        tracing::debug!(pattern = matcher.pattern(), unbounded, "deleting range");
        let deleted = self.storage.remove_data(matcher, bounds).await?;

        if unbounded {
            // marker keys are id/type, so the type pattern sits at the
            // second level instead of the trailing wildcard
            let marker_pattern = format!(
                "{}{}{}",
                selection.id_pattern.as_deref().unwrap_or(key::WILDCARD),
                key::SEPARATOR,
                selection.type_pattern.as_deref().unwrap_or(key::WILDCARD),
            );
            let removed = self
                .storage
                .remove_type_markers(pattern::compile(&marker_pattern)?)
                .await?;
            tracing::debug!(removed, "dropped type markers for unbounded delete");
        }

        Ok(deleted)
    }

    /// Inserts a single data point at the given time expression, or at the
    /// current time when none is supplied.
    pub async fn append_point(
        &self,
        id: &str,
        type_name: &str,
        at: Option<&str>,
        value: f64,
    ) -> Result<DataPoint> {
        key::validate_segment(id)?;
        key::validate_segment(type_name)?;
        let timestamp = match at {
            Some(expr) => timestamp::parse(expr, self.clock.as_ref())?,
            None => self.clock.now_ms(),
        };
        let point = DataPoint::new(id, type_name, timestamp, value);
        self.storage.upsert_point(&point).await?;
        Ok(point)
    }

    /// Removes every trace of the ids matching the pattern: data points,
    /// type markers, and the identifier markers themselves. Returns the
    /// number of data points removed.
    pub async fn delete_series(&self, id_pattern: &str) -> Result<u64> {
        let data = self
            .storage
            .remove_data(compile_prefix(id_pattern, Some(key::WILDCARD))?, None)
            .await?;
        let types = self
            .storage
            .remove_type_markers(compile_prefix(id_pattern, None)?)
            .await?;
        let ids = self.storage.remove_ids(pattern::compile(id_pattern)?).await?;
        tracing::debug!(data, types, ids, "deleted series");
        Ok(data)
    }

    /// Parses an optional raw time-bound expression.
    fn parse_bound(&self, bound: Option<&str>) -> Result<Option<i64>> {
        bound
            .map(|expr| timestamp::parse(expr, self.clock.as_ref()))
            .transpose()
    }

    /// Read bounds: inclusive `gte`/`lte` from whichever bounds are present.
    fn read_bounds(&self, selection: &Selection) -> Result<Option<TimeFilter>> {
        let gte = self.parse_bound(selection.start.as_deref())?;
        let lte = self.parse_bound(selection.stop.as_deref())?;
        if gte.is_none() && lte.is_none() {
            return Ok(None);
        }
        Ok(Some(TimeFilter { gte, lte }))
    }
}

/// Deletion bounds: without a `start` the whole prefix is covered and any
/// `stop` is ignored.
fn delete_bounds(start: Option<i64>, stop: Option<i64>) -> Option<TimeFilter> {
    start.map(|gte| TimeFilter {
        gte: Some(gte),
        lte: stop,
    })
}

/// Insertion-side bound check for replace bodies, mirroring
/// [`delete_bounds`].
fn in_bounds(timestamp: i64, start: Option<i64>, stop: Option<i64>) -> bool {
    match start {
        None => true,
        Some(start) => timestamp >= start && stop.is_none_or(|stop| timestamp <= stop),
    }
}

/// Matcher over the full data-key space of a selection:
/// `(idPattern ?? *)/(typePattern ?? *)/*`.
fn data_matcher(selection: &Selection) -> Result<KeyMatcher> {
    compile_prefix(
        selection.id_pattern.as_deref().unwrap_or(key::WILDCARD),
        Some(selection.type_pattern.as_deref().unwrap_or(key::WILDCARD)),
    )
}

fn compile_prefix(id_pattern: &str, type_pattern: Option<&str>) -> Result<KeyMatcher> {
    pattern::compile(&key::compose_prefix(id_pattern, type_pattern))
}

/// Compiles a single-segment matcher when a pattern was supplied; `None`
/// means "accept every segment" without invoking the compiler.
fn compile_optional(pattern: Option<&str>) -> Result<Option<KeyMatcher>> {
    pattern.map(pattern::compile).transpose()
}

fn accepts(matcher: &Option<KeyMatcher>, segment: &str) -> bool {
    matcher.as_ref().is_none_or(|m| m.test(segment))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::storage::MemoryStore;
    use common::MockClock;

    use super::*;

    const NOW_MS: u64 = 1_700_000_000_000;

    fn engine() -> SeriesEngine {
        SeriesEngine::with_clock(Arc::new(MemoryStore::new()), Arc::new(MockClock::at_ms(NOW_MS)))
    }

    fn body(entries: &[(&str, &str, i64, f64)]) -> SeriesBody {
        let mut body = SeriesBody::new();
        for (id, type_name, ts, value) in entries {
            body.entry(id.to_string())
                .or_default()
                .entry(type_name.to_string())
                .or_default()
                .insert(*ts, *value);
        }
        body
    }

    #[tokio::test]
    async fn should_open_engine_from_default_config() {
        // given
        let engine = SeriesEngine::open(&Config::default()).unwrap();

        // when/then
        assert!(engine.list_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_list_ids_after_insert() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 21.5), ("sensorB", "rpm", 1000, 7.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        let ids = engine.list_ids().await.unwrap();

        // then
        assert_eq!(ids, vec!["sensorA", "sensorB"]);
    }

    #[tokio::test]
    async fn should_group_types_by_id() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[
                    ("sensorA", "tempC", 1000, 1.0),
                    ("sensorA", "humidity", 1000, 2.0),
                    ("sensorB", "rpm", 1000, 3.0),
                ]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        let listing = engine.list_types(Some("sensorA")).await.unwrap();

        // then
        assert_eq!(listing.len(), 1);
        let types: Vec<_> = listing["sensorA"].iter().cloned().collect();
        assert_eq!(types, vec!["humidity", "tempC"]);
    }

    #[tokio::test]
    async fn should_read_back_inserted_range() {
        // given
        let engine = engine();
        let inserted = body(&[("sensorA", "tempC", 1000, 21.5), ("sensorA", "tempC", 2000, 22.0)]);
        engine
            .replace_range(&inserted, &Selection::default())
            .await
            .unwrap();

        // when
        let read = engine
            .read_range(&Selection {
                id_pattern: Some("sensorA".into()),
                type_pattern: Some("tempC".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        // then
        assert_eq!(read, inserted);
    }

    #[tokio::test]
    async fn should_apply_start_bound_on_read() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 21.5), ("sensorA", "tempC", 2000, 22.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        let read = engine
            .read_range(&Selection {
                id_pattern: Some("sensorA".into()),
                type_pattern: Some("tempC".into()),
                start: Some("1500".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        // then
        assert_eq!(read, body(&[("sensorA", "tempC", 2000, 22.0)]));
    }

    #[tokio::test]
    async fn should_return_empty_body_for_inverted_bounds() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1500, 1.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        let read = engine
            .read_range(&Selection {
                start: Some("2000".into()),
                stop: Some("1000".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        // then
        assert!(read.is_empty());
    }

    #[tokio::test]
    async fn should_replace_overlapping_points_with_new_values() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 21.5)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        let summary = engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 30.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // then
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.inserted, 1);
        let read = engine.read_range(&Selection::default()).await.unwrap();
        assert_eq!(read, body(&[("sensorA", "tempC", 1000, 30.0)]));
    }

    #[tokio::test]
    async fn should_filter_body_leaves_outside_the_selection() {
        // given
        let engine = engine();

        // when - only sensorA points between 1000 and 2000 are accepted
        let summary = engine
            .replace_range(
                &body(&[
                    ("sensorA", "tempC", 1000, 1.0),
                    ("sensorA", "tempC", 3000, 2.0),
                    ("sensorB", "tempC", 1500, 3.0),
                ]),
                &Selection {
                    id_pattern: Some("sensorA".into()),
                    start: Some("1000".into()),
                    stop: Some("2000".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // then
        assert_eq!(summary.inserted, 1);
        let read = engine.read_range(&Selection::default()).await.unwrap();
        assert_eq!(read, body(&[("sensorA", "tempC", 1000, 1.0)]));
    }

    #[tokio::test]
    async fn should_reject_body_with_reserved_characters_before_mutating() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 1.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when - the body is invalid, so nothing may be deleted
        let err = engine
            .replace_range(&body(&[("bad/id", "tempC", 1000, 1.0)]), &Selection::default())
            .await
            .unwrap_err();

        // then
        assert!(matches!(err, Error::MalformedKey { .. }));
        let read = engine.read_range(&Selection::default()).await.unwrap();
        assert_eq!(read, body(&[("sensorA", "tempC", 1000, 1.0)]));
    }

    #[tokio::test]
    async fn should_delete_range_with_start_only() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 1.0), ("sensorA", "tempC", 2000, 2.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        let deleted = engine
            .delete_range(&Selection {
                id_pattern: Some("sensorA".into()),
                type_pattern: Some("tempC".into()),
                start: Some("1500".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        // then
        assert_eq!(deleted, 1);
        let read = engine.read_range(&Selection::default()).await.unwrap();
        assert_eq!(read, body(&[("sensorA", "tempC", 1000, 1.0)]));
    }

    #[tokio::test]
    async fn should_drop_type_markers_on_unbounded_delete() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 1.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        engine
            .delete_range(&Selection {
                id_pattern: Some("sensorA".into()),
                type_pattern: Some("*".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        // then
        let listing = engine.list_types(Some("sensorA")).await.unwrap();
        assert!(listing.is_empty());
    }

    #[tokio::test]
    async fn should_keep_type_markers_on_bounded_delete() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 1.0), ("sensorA", "tempC", 2000, 2.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        engine
            .delete_range(&Selection {
                id_pattern: Some("sensorA".into()),
                start: Some("1500".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        // then
        let listing = engine.list_types(Some("sensorA")).await.unwrap();
        assert_eq!(listing["sensorA"].len(), 1);
    }

    #[tokio::test]
    async fn should_append_point_at_the_clock_time() {
        // given
        let engine = engine();

        // when
        let point = engine.append_point("sensorA", "tempC", None, 21.5).await.unwrap();

        // then
        assert_eq!(point.timestamp, NOW_MS as i64);
        let read = engine.read_range(&Selection::default()).await.unwrap();
        assert_eq!(read["sensorA"]["tempC"][&(NOW_MS as i64)], 21.5);
        assert_eq!(engine.list_ids().await.unwrap(), vec!["sensorA"]);
    }

    #[tokio::test]
    async fn should_append_point_at_an_explicit_expression() {
        // given
        let engine = engine();

        // when
        let point = engine
            .append_point("sensorA", "tempC", Some("-1h"), 21.5)
            .await
            .unwrap();

        // then
        assert_eq!(point.timestamp, NOW_MS as i64 - 3_600_000);
    }

    #[tokio::test]
    async fn should_delete_series_including_markers() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 1.0), ("sensorB", "rpm", 1000, 2.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        let deleted = engine.delete_series("sensorA").await.unwrap();

        // then
        assert_eq!(deleted, 1);
        assert_eq!(engine.list_ids().await.unwrap(), vec!["sensorB"]);
        assert!(engine.list_types(Some("sensorA")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_propagate_invalid_pattern_before_mutation() {
        // given
        let engine = engine();
        engine
            .replace_range(
                &body(&[("sensorA", "tempC", 1000, 1.0)]),
                &Selection::default(),
            )
            .await
            .unwrap();

        // when
        let err = engine
            .delete_range(&Selection {
                id_pattern: Some("bad\\".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        // then
        assert!(matches!(err, Error::InvalidPattern { .. }));
        assert_eq!(engine.list_ids().await.unwrap(), vec!["sensorA"]);
    }

    #[tokio::test]
    async fn should_propagate_unparseable_bound() {
        // given
        let engine = engine();

        // when
        let err = engine
            .read_range(&Selection {
                start: Some("not-a-date-at-all-xyz".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        // then
        assert!(matches!(err, Error::UnparseableTimestamp { .. }));
    }
}
