//! Settings threaded into [`crate::CommandFactory`].
//!
//! ```toml
//! # Prepended to every key token, e.g. "tenant-a:".
//! key_prefix = "tenant-a:"
//!
//! # Query dialect appended to FT.SEARCH when the call names none.
//! search_dialect = 2
//!
//! # "broadcast" (default) or "light".
//! search_mode = "light"
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How index commands are routed when nodes run the search module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Every node keeps its own copy of each index, so index definitions and search
    /// configuration are sent to every node.
    #[default]
    Broadcast,
    /// Indexes are cluster-aware. `FT.*` commands run on one node, routed by index name.
    Light,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_dialect: Option<u32>,
    #[serde(default)]
    pub search_mode: SearchMode,
}

impl FactoryConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: FactoryConfig = toml::from_str(source)
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Dialects start at 1.
    pub fn validate(&self) -> Result<()> {
        if self.search_dialect == Some(0) {
            return Err(Error::Config("search_dialect must be at least 1".into()));
        }
        Ok(())
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn search_dialect(mut self, dialect: u32) -> Self {
        self.search_dialect = Some(dialect);
        self
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    pub(crate) fn key_prefix_bytes(&self) -> Option<Bytes> {
        self.key_prefix
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(|p| Bytes::copy_from_slice(p.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml() {
        let config = FactoryConfig::from_toml_str(
            r#"
            key_prefix = "tenant-a:"
            search_dialect = 2
            search_mode = "light"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            FactoryConfig::default()
                .key_prefix("tenant-a:")
                .search_dialect(2)
                .search_mode(SearchMode::Light)
        );
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            FactoryConfig::from_toml_str("").unwrap(),
            FactoryConfig::default()
        );
    }

    #[test]
    fn rejects_unknown_keys_and_zero_dialect() {
        assert!(FactoryConfig::from_toml_str("prefix = \"x\"").is_err());
        assert!(FactoryConfig::from_toml_str("search_dialect = 0").is_err());
        assert!(FactoryConfig::from_toml_str("search_mode = \"heavy\"").is_err());
    }

    #[test]
    fn search_mode_defaults_to_broadcast() {
        let config = FactoryConfig::from_toml_str("key_prefix = \"a:\"").unwrap();
        assert_eq!(config.search_mode, SearchMode::Broadcast);
    }
}
