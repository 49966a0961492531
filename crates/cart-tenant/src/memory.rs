//! In-memory tenant store for testing and development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::record::TenantRecord;
use crate::store::TenantStore;

/// In-memory tenant store. Records are not persisted across restarts.
#[derive(Debug, Clone, Default)]
pub struct MemoryTenantStore {
    data: Arc<RwLock<HashMap<String, TenantRecord>>>,
}

impl MemoryTenantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn get(&self, client_id: &str) -> Result<Option<TenantRecord>, StoreError> {
        let data = self.data.read().await;
        Ok(data.get(client_id).cloned())
    }

    async fn put(&self, record: &TenantRecord) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        data.insert(record.client_id.clone(), record.clone());

        tracing::debug!(client_id = %record.client_id, "tenant record stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_put_round_trip() {
        let store = MemoryTenantStore::new();
        assert!(store.get("acme").await.unwrap().is_none());

        let mut record = TenantRecord::new("acme");
        record.pk_test = Some("pk_test_1".into());
        store.put(&record).await.unwrap();

        let loaded = store.get("acme").await.unwrap().unwrap();
        assert_eq!(loaded.client_id, "acme");
        assert_eq!(loaded.pk_test.as_deref(), Some("pk_test_1"));
    }

    #[tokio::test]
    async fn put_replaces_whole_record() {
        let store = MemoryTenantStore::new();

        let mut first = TenantRecord::new("acme");
        first.pk_test = Some("pk_test_1".into());
        store.put(&first).await.unwrap();

        let second = TenantRecord::new("acme");
        store.put(&second).await.unwrap();

        let loaded = store.get("acme").await.unwrap().unwrap();
        assert!(loaded.pk_test.is_none());
    }

    #[tokio::test]
    async fn records_are_isolated_by_client_id() {
        let store = MemoryTenantStore::new();
        store.put(&TenantRecord::new("acme")).await.unwrap();
        store.put(&TenantRecord::new("globex")).await.unwrap();

        assert!(store.get("acme").await.unwrap().is_some());
        assert!(store.get("globex").await.unwrap().is_some());
        assert!(store.get("initech").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_writers_last_writer_wins() {
        let store = Arc::new(MemoryTenantStore::new());

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut record = TenantRecord::new("acme");
                record.pk_test = Some(format!("pk_test_{i}"));
                store.put(&record).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let loaded = store.get("acme").await.unwrap().unwrap();
        assert!(loaded.pk_test.unwrap().starts_with("pk_test_"));
    }
}
