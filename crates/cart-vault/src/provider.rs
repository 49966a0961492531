//! Factory for envelope cipher backends.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::cipher::EnvelopeCipher;
use crate::error::VaultError;
use crate::local::LocalMasterKey;

/// Cipher backend configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum CipherConfig {
    /// Throwaway in-process key. Tests and local development only:
    /// ciphertext does not survive a restart.
    #[default]
    Ephemeral,

    /// Master key loaded from a file (32 raw bytes or 64 hex characters,
    /// owner-only permissions).
    Keyfile {
        /// Path to the key file.
        path: PathBuf,
    },
}

/// Builds a cipher backend from configuration.
///
/// # Errors
///
/// Returns [`VaultError::NotConfigured`] when the configured key source is
/// unusable. This is fatal at startup; the service must not come up able to
/// read records it cannot decrypt or, worse, silently write plaintext.
pub fn build_cipher(config: &CipherConfig) -> Result<Arc<dyn EnvelopeCipher>, VaultError> {
    match config {
        CipherConfig::Ephemeral => {
            tracing::warn!("using ephemeral master key; stored ciphertext will not survive restart");
            Ok(Arc::new(LocalMasterKey::ephemeral()))
        }
        CipherConfig::Keyfile { path } => {
            let cipher = LocalMasterKey::from_key_file(path)
                .map_err(|e| VaultError::NotConfigured(e.to_string()))?;
            tracing::info!(path = %path.display(), "master key loaded");
            Ok(Arc::new(cipher))
        }
    }
}
