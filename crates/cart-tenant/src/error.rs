//! Error types for tenant storage and the directory service.

use thiserror::Error;

use cart_vault::VaultError;

/// Errors from a [`TenantStore`](crate::TenantStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend connection failure.
    #[error("store connection error: {0}")]
    Connection(String),

    /// Backend operation failure.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored document could not be decoded into a record.
    #[error("stored record is malformed: {0}")]
    Serialization(String),
}

/// Errors from [`TenantDirectory`](crate::TenantDirectory) operations.
///
/// Expected absence ([`TenantError::NotFound`], [`TenantError::FieldNotSet`])
/// is distinct from real failure so callers can map them to different
/// responses without string-matching messages.
#[derive(Debug, Error)]
pub enum TenantError {
    /// No record exists for the client id, or the record is deactivated
    /// where an active one is required.
    #[error("tenant not found: {0}")]
    NotFound(String),

    /// The record exists but a required credential field is not set.
    #[error("credential not configured: {0}")]
    FieldNotSet(String),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Vault failure: encryption aborts the write, decryption is terminal
    /// for the field it concerns.
    #[error(transparent)]
    Vault(#[from] VaultError),
}
