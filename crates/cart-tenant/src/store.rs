use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::TenantRecord;

/// Backend trait for tenant record storage.
///
/// Get/put by client id over whole records; merge semantics live above the
/// trait in [`TenantDirectory`](crate::TenantDirectory). There is no
/// hard-delete operation: tenants are deactivated by writing
/// `active = false`.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Fetches the record for a client id, or `None` when absent.
    async fn get(&self, client_id: &str) -> Result<Option<TenantRecord>, StoreError>;

    /// Writes a whole record, replacing any existing one.
    async fn put(&self, record: &TenantRecord) -> Result<(), StoreError>;
}
