//! Store configuration types.
//!
//! Services select a Document Store backend via config files or environment
//! overlays. Only the in-memory backend ships with the workspace; durable
//! backends plug in through the same [`StoreConfig`] enum and
//! [`create_store`](super::create_store) factory.

use serde::{Deserialize, Serialize};

/// Document Store backend selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// Volatile in-memory backend (tests, development, single-process use).
    #[default]
    InMemory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_in_memory() {
        assert_eq!(StoreConfig::default(), StoreConfig::InMemory);
    }

    #[test]
    fn should_deserialize_in_memory_config() {
        // given
        let yaml = r#"type: InMemory"#;

        // when
        let config: StoreConfig = serde_yaml::from_str(yaml).unwrap();

        // then
        assert_eq!(config, StoreConfig::InMemory);
    }

    #[test]
    fn should_serialize_with_type_tag() {
        // given
        let config = StoreConfig::InMemory;

        // when
        let yaml = serde_yaml::to_string(&config).unwrap();

        // then
        assert!(yaml.contains("type: InMemory"));
    }
}
