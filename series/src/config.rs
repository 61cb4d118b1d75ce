//! Configuration for opening a [`SeriesEngine`](crate::SeriesEngine).

use common::StoreConfig;
use serde::{Deserialize, Serialize};

/// Engine configuration.
///
/// Currently just the Document Store backend selection; see
/// [`StoreConfig`] for the available backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Document Store backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
}
