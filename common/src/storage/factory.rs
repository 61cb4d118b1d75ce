//! Store factory for creating Document Store instances from configuration.

use std::sync::Arc;

use super::config::StoreConfig;
use super::memory::MemoryStore;
use super::{DocumentStore, StoreResult};

/// Creates a Document Store based on the provided configuration.
pub fn create_store(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    match config {
        StoreConfig::InMemory => Ok(Arc::new(MemoryStore::new())),
    }
}
