//! In-memory configuration store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ConfigError;
use crate::store::{ConfigEntry, ConfigScope, ConfigStore};

/// In-memory configuration store, keyed by `(scope, key)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    data: Arc<RwLock<HashMap<(String, String), ConfigEntry>>>,
}

impl MemoryConfigStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a batch of rows; used at startup to load deployment defaults.
    pub async fn seed(&self, entries: impl IntoIterator<Item = ConfigEntry>) {
        let mut data = self.data.write().await;
        for entry in entries {
            data.insert((entry.scope.key().to_owned(), entry.key.clone()), entry);
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self, scope: &ConfigScope) -> Result<Vec<ConfigEntry>, ConfigError> {
        let data = self.data.read().await;
        let mut entries: Vec<_> = data
            .values()
            .filter(|e| &e.scope == scope)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn put(&self, entry: ConfigEntry) -> Result<(), ConfigError> {
        let mut data = self.data.write().await;
        data.insert((entry.scope.key().to_owned(), entry.key.clone()), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_and_load_by_scope() {
        let store = MemoryConfigStore::new();
        store
            .put(ConfigEntry::new(
                "base_frontend_url",
                ConfigScope::Global,
                serde_json::json!("https://example.com/tenants/"),
            ))
            .await
            .unwrap();
        store
            .put(ConfigEntry::new(
                "base_frontend_url",
                ConfigScope::Environment("prod".into()),
                serde_json::json!("https://shop.example.com/"),
            ))
            .await
            .unwrap();

        let global = store.load(&ConfigScope::Global).await.unwrap();
        assert_eq!(global.len(), 1);

        let prod = store
            .load(&ConfigScope::Environment("prod".into()))
            .await
            .unwrap();
        assert_eq!(prod.len(), 1);
        assert_eq!(prod[0].value, serde_json::json!("https://shop.example.com/"));

        let dev = store
            .load(&ConfigScope::Environment("dev".into()))
            .await
            .unwrap();
        assert!(dev.is_empty());
    }

    #[tokio::test]
    async fn prefixed_filters_tenant_keys() {
        let store = MemoryConfigStore::new();
        let scope = ConfigScope::Environment("dev".into());

        for key in ["acme:thank_you", "acme:refund", "globex:thank_you"] {
            store
                .put(ConfigEntry::new(key, scope.clone(), serde_json::json!("x")))
                .await
                .unwrap();
        }

        let acme = store.prefixed(&scope, "acme:").await.unwrap();
        assert_eq!(acme.len(), 2);
        assert!(acme.iter().all(|e| e.key.starts_with("acme:")));
    }
}
