//! Series-specific storage wrapper.
//!
//! Wraps `Arc<dyn DocumentStore>` with the operations the engine needs:
//! marker queries, data reads mapped back into [`DataPoint`]s, and writes
//! that keep the marker collections in step with the data collection.

use std::sync::Arc;

use common::{Collection, Document, DocumentStore, Filter, StoreError, TimeFilter};

use crate::error::{Error, Result};
use crate::key;
use crate::model::DataPoint;
use crate::pattern::KeyMatcher;

#[derive(Clone)]
pub(crate) struct SeriesStorage {
    store: Arc<dyn DocumentStore>,
}

impl SeriesStorage {
    pub(crate) fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates a series storage with an in-memory backend.
    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self::new(Arc::new(common::storage::MemoryStore::new()))
    }

    /// Every known id, from the identifier-marker collection.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn find_ids(&self) -> Result<Vec<String>> {
        let markers = self
            .store
            .find(Collection::Ids, Filter::all())
            .await
            .map_err(store_error)?;
        Ok(markers.into_iter().map(|doc| doc.key).collect())
    }

    /// Type-marker keys (`id/type`) accepted by the matcher.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn find_type_markers(&self, matcher: KeyMatcher) -> Result<Vec<String>> {
        let markers = self
            .store
            .find(Collection::Types, Filter::matching(Arc::new(matcher)))
            .await
            .map_err(store_error)?;
        Ok(markers.into_iter().map(|doc| doc.key).collect())
    }

    /// Data points accepted by the matcher and the optional time bounds.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn find_data(
        &self,
        matcher: KeyMatcher,
        time: Option<TimeFilter>,
    ) -> Result<Vec<DataPoint>> {
        let mut filter = Filter::matching(Arc::new(matcher));
        if let Some(time) = time {
            filter = filter.with_time(time);
        }
        let documents = self
            .store
            .find(Collection::Data, filter)
            .await
            .map_err(store_error)?;

        documents.into_iter().map(decode_point).collect()
    }

    /// Writes a data point and the marker documents that witness its id and
    /// `(id, type)` pair. Marker upserts are idempotent.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn upsert_point(&self, point: &DataPoint) -> Result<()> {
        self.store
            .upsert(Collection::Ids, Document::marker(&point.id))
            .await
            .map_err(store_error)?;
        self.store
            .upsert(
                Collection::Types,
                Document::marker(format!("{}/{}", point.id, point.type_name)),
            )
            .await
            .map_err(store_error)?;
        self.store
            .upsert(
                Collection::Data,
                Document::point(point.key(), point.timestamp, point.value),
            )
            .await
            .map_err(store_error)?;
        Ok(())
    }

    /// Removes data points accepted by the matcher and the optional time
    /// bounds; returns the count.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn remove_data(
        &self,
        matcher: KeyMatcher,
        time: Option<TimeFilter>,
    ) -> Result<u64> {
        let mut filter = Filter::matching(Arc::new(matcher));
        if let Some(time) = time {
            filter = filter.with_time(time);
        }
        self.store
            .remove(Collection::Data, filter)
            .await
            .map_err(store_error)
    }

    /// Removes type markers accepted by the matcher.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn remove_type_markers(&self, matcher: KeyMatcher) -> Result<u64> {
        self.store
            .remove(Collection::Types, Filter::matching(Arc::new(matcher)))
            .await
            .map_err(store_error)
    }

    /// Removes identifier markers accepted by the matcher.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) async fn remove_ids(&self, matcher: KeyMatcher) -> Result<u64> {
        self.store
            .remove(Collection::Ids, Filter::matching(Arc::new(matcher)))
            .await
            .map_err(store_error)
    }
}

fn store_error(err: StoreError) -> Error {
    Error::Store(err.to_string())
}

/// Maps a stored data document back into a [`DataPoint`].
///
/// The timestamp of record is the key's third segment; a data document
/// without a value field is corrupt.
fn decode_point(document: Document) -> Result<DataPoint> {
    let (id, type_name, timestamp) = key::decompose(&document.key)?;
    let value = document.value.ok_or_else(|| {
        Error::Store(format!("data document `{}` has no value", document.key))
    })?;
    Ok(DataPoint {
        id,
        type_name,
        timestamp,
        value,
    })
}
