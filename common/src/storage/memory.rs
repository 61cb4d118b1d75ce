//! In-memory Document Store backend.
//!
//! Keeps one ordered map per collection behind a `RwLock`. This is the
//! backend used in tests and single-process deployments; durable backends
//! implement the same [`DocumentStore`] trait.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{Collection, Document, DocumentStore, Filter, StoreError, StoreResult};

#[derive(Default)]
struct Collections {
    ids: BTreeMap<String, Document>,
    types: BTreeMap<String, Document>,
    data: BTreeMap<String, Document>,
}

impl Collections {
    fn shelf(&self, collection: Collection) -> &BTreeMap<String, Document> {
        match collection {
            Collection::Ids => &self.ids,
            Collection::Types => &self.types,
            Collection::Data => &self.data,
        }
    }

    fn shelf_mut(&mut self, collection: Collection) -> &mut BTreeMap<String, Document> {
        match collection {
            Collection::Ids => &mut self.ids,
            Collection::Types => &mut self.types,
            Collection::Data => &mut self.data,
        }
    }
}

/// In-memory implementation of the [`DocumentStore`] trait.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn find(&self, collection: Collection, filter: Filter) -> StoreResult<Vec<Document>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(inner
            .shelf(collection)
            .values()
            .filter(|doc| filter.accepts(doc))
            .cloned()
            .collect())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn upsert(&self, collection: Collection, document: Document) -> StoreResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        inner
            .shelf_mut(collection)
            .insert(document.key.clone(), document);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn remove(&self, collection: Collection, filter: Filter) -> StoreResult<u64> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let shelf = inner.shelf_mut(collection);
        let doomed: Vec<String> = shelf
            .values()
            .filter(|doc| filter.accepts(doc))
            .map(|doc| doc.key.clone())
            .collect();
        for key in &doomed {
            shelf.remove(key);
        }
        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{KeyPredicate, TimeFilter};

    struct ExactKey(&'static str);

    impl KeyPredicate for ExactKey {
        fn matches(&self, key: &str) -> bool {
            key == self.0
        }
    }

    #[tokio::test]
    async fn should_find_upserted_document() {
        // given
        let store = MemoryStore::new();
        store
            .upsert(Collection::Data, Document::point("a/b/1000", 1000, 1.5))
            .await
            .unwrap();

        // when
        let found = store.find(Collection::Data, Filter::all()).await.unwrap();

        // then
        assert_eq!(found, vec![Document::point("a/b/1000", 1000, 1.5)]);
    }

    #[tokio::test]
    async fn should_replace_document_on_upsert_with_same_key() {
        // given
        let store = MemoryStore::new();
        store
            .upsert(Collection::Data, Document::point("a/b/1000", 1000, 1.5))
            .await
            .unwrap();

        // when
        store
            .upsert(Collection::Data, Document::point("a/b/1000", 1000, 9.0))
            .await
            .unwrap();

        // then
        let found = store.find(Collection::Data, Filter::all()).await.unwrap();
        assert_eq!(found, vec![Document::point("a/b/1000", 1000, 9.0)]);
    }

    #[tokio::test]
    async fn should_keep_collections_separate() {
        // given
        let store = MemoryStore::new();
        store
            .upsert(Collection::Ids, Document::marker("a"))
            .await
            .unwrap();

        // when
        let data = store.find(Collection::Data, Filter::all()).await.unwrap();
        let ids = store.find(Collection::Ids, Filter::all()).await.unwrap();

        // then
        assert!(data.is_empty());
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn should_remove_only_matching_documents() {
        // given
        let store = MemoryStore::new();
        store
            .upsert(Collection::Data, Document::point("a/b/1000", 1000, 1.0))
            .await
            .unwrap();
        store
            .upsert(Collection::Data, Document::point("a/b/2000", 2000, 2.0))
            .await
            .unwrap();

        // when
        let removed = store
            .remove(
                Collection::Data,
                Filter::matching(Arc::new(ExactKey("a/b/1000"))),
            )
            .await
            .unwrap();

        // then
        assert_eq!(removed, 1);
        let rest = store.find(Collection::Data, Filter::all()).await.unwrap();
        assert_eq!(rest, vec![Document::point("a/b/2000", 2000, 2.0)]);
    }

    #[tokio::test]
    async fn should_remove_by_time_range() {
        // given
        let store = MemoryStore::new();
        for ts in [1000, 2000, 3000] {
            store
                .upsert(
                    Collection::Data,
                    Document::point(format!("a/b/{ts}"), ts, ts as f64),
                )
                .await
                .unwrap();
        }

        // when
        let removed = store
            .remove(
                Collection::Data,
                Filter::all().with_time(TimeFilter {
                    gte: Some(2000),
                    lte: None,
                }),
            )
            .await
            .unwrap();

        // then
        assert_eq!(removed, 2);
        let rest = store.find(Collection::Data, Filter::all()).await.unwrap();
        assert_eq!(rest, vec![Document::point("a/b/1000", 1000, 1000.0)]);
    }
}
