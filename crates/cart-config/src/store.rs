//! Configuration row store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The scope a configuration row applies to. Serialises as the bare scope
/// key: `"global"` or the environment name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigScope {
    /// Applies to every environment.
    Global,
    /// Applies to one named environment and overrides global rows there.
    Environment(String),
}

impl ConfigScope {
    /// Storage key for the scope (`global` or the environment name).
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Global => "global",
            Self::Environment(env) => env,
        }
    }

    /// Parses a stored scope key.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        if key == "global" {
            Self::Global
        } else {
            Self::Environment(key.to_owned())
        }
    }
}

impl std::fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for ConfigScope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for ConfigScope {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(Self::from_key(&key))
    }
}

/// One configuration row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub scope: ConfigScope,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl ConfigEntry {
    /// Creates a row stamped now.
    #[must_use]
    pub fn new(key: impl Into<String>, scope: ConfigScope, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            scope,
            value,
            updated_at: Utc::now(),
        }
    }
}

/// Backend trait for configuration rows.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Loads every row in a scope.
    async fn load(&self, scope: &ConfigScope) -> Result<Vec<ConfigEntry>, ConfigError>;

    /// Upserts a row, keyed by `(scope, key)`.
    async fn put(&self, entry: ConfigEntry) -> Result<(), ConfigError>;

    /// Rows in a scope whose key starts with `prefix`. Used for
    /// tenant-scoped keys of the form `<client_id>:<name>`.
    async fn prefixed(
        &self,
        scope: &ConfigScope,
        prefix: &str,
    ) -> Result<Vec<ConfigEntry>, ConfigError> {
        let mut entries = self.load(scope).await?;
        entries.retain(|e| e.key.starts_with(prefix));
        Ok(entries)
    }
}
