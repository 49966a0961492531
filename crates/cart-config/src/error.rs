//! Error types for configuration loading.

use thiserror::Error;

/// Errors from configuration stores and snapshots.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A key marked required is absent from the merged snapshot.
    #[error("missing required config key: {key} (environment: {environment})")]
    MissingKey { key: String, environment: String },

    /// Backend failure while reading or writing rows.
    #[error("config store error: {0}")]
    Store(String),
}
