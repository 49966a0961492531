//! Merged configuration snapshots with a TTL cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::error::ConfigError;
use crate::store::{ConfigScope, ConfigStore};

/// An immutable merged snapshot: global rows overlaid by the rows of one
/// environment, plus the `environment` convenience key.
#[derive(Debug, Clone)]
pub struct AppConfig {
    values: BTreeMap<String, serde_json::Value>,
    environment: String,
}

impl AppConfig {
    /// The environment this snapshot was merged for.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Looks up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Looks up a string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(serde_json::Value::as_str)
    }

    /// Looks up a value, failing with [`ConfigError::MissingKey`] when
    /// absent.
    pub fn require(&self, key: &str) -> Result<&serde_json::Value, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            key: key.to_owned(),
            environment: self.environment.clone(),
        })
    }

    /// Number of keys in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the snapshot holds no keys beyond the
    /// `environment` marker.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.len() <= 1
    }
}

struct CachedSnapshot {
    config: Arc<AppConfig>,
    loaded_at: Instant,
}

/// TTL cache over the merged configuration snapshot.
///
/// Explicitly constructed and injected; the lifecycle is `load` (cached
/// within the TTL), `refresh` (force a re-read), `invalidate` (drop the
/// snapshot so the next `load` re-reads).
pub struct ConfigCache {
    store: Arc<dyn ConfigStore>,
    environment: String,
    ttl: Duration,
    cached: RwLock<Option<CachedSnapshot>>,
}

impl ConfigCache {
    /// Creates a cache for one environment.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>, environment: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            environment: environment.into(),
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// The environment this cache merges for.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// The backing store, for writers that bypass the snapshot.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Returns the merged snapshot, reading the store only when the cached
    /// copy is absent or older than the TTL.
    pub async fn load(&self) -> Result<Arc<AppConfig>, ConfigError> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.loaded_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&entry.config));
                }
            }
        }
        self.refresh().await
    }

    /// Re-reads the store unconditionally and replaces the cached snapshot.
    pub async fn refresh(&self) -> Result<Arc<AppConfig>, ConfigError> {
        let config = Arc::new(self.read_merged().await?);

        let mut cached = self.cached.write().await;
        *cached = Some(CachedSnapshot {
            config: Arc::clone(&config),
            loaded_at: Instant::now(),
        });

        tracing::debug!(
            environment = %self.environment,
            keys = config.len(),
            "config snapshot refreshed"
        );
        Ok(config)
    }

    /// Drops the cached snapshot; the next `load` re-reads the store.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
    }

    async fn read_merged(&self) -> Result<AppConfig, ConfigError> {
        let mut values = BTreeMap::new();

        for entry in self.store.load(&ConfigScope::Global).await? {
            values.insert(entry.key, entry.value);
        }
        for entry in self
            .store
            .load(&ConfigScope::Environment(self.environment.clone()))
            .await?
        {
            values.insert(entry.key, entry.value);
        }

        values.insert(
            "environment".to_owned(),
            serde_json::Value::String(self.environment.clone()),
        );

        Ok(AppConfig {
            values,
            environment: self.environment.clone(),
        })
    }
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("environment", &self.environment)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
