//! Factory for tenant store backends.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::StoreError;
use crate::store::TenantStore;

#[cfg(feature = "memory")]
use crate::memory::MemoryTenantStore;

#[cfg(feature = "postgres")]
use crate::postgres::PostgresTenantStore;

/// Tenant store backend configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-memory backend for testing and development.
    #[default]
    Memory,

    /// PostgreSQL document table.
    #[cfg(feature = "postgres")]
    Postgres {
        /// Connection URL.
        url: String,
        /// Table name.
        #[serde(default = "default_table")]
        table: String,
    },
}

#[cfg(feature = "postgres")]
fn default_table() -> String {
    "stripe_keys".to_owned()
}

/// Builds a tenant store from configuration.
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn TenantStore>, StoreError> {
    match config {
        #[cfg(feature = "memory")]
        StoreConfig::Memory => Ok(Arc::new(MemoryTenantStore::new())),

        #[cfg(feature = "postgres")]
        StoreConfig::Postgres { url, table } => {
            let store = PostgresTenantStore::new(url, table.clone()).await?;
            Ok(Arc::new(store))
        }

        #[allow(unreachable_patterns)]
        _ => Err(StoreError::Backend(
            "no suitable tenant store backend enabled".to_owned(),
        )),
    }
}
