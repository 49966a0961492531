//! Error types for the secret vault.

use thiserror::Error;

/// Errors surfaced by an [`EnvelopeCipher`](crate::EnvelopeCipher) backend.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The ciphertext was rejected by the cipher: wrong or missing context,
    /// truncated or corrupted blob. This is the only class eligible for the
    /// single legacy retry without a context.
    #[error("invalid ciphertext")]
    InvalidCiphertext,

    /// The master key is missing, unreadable, or unusable.
    #[error("master key unavailable: {0}")]
    KeyUnavailable(String),

    /// Backend failure unrelated to the ciphertext itself.
    #[error("cipher backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by [`SecretVault`](crate::SecretVault) operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A required vault parameter (master key source) is absent. Fatal at
    /// startup, not retryable.
    #[error("vault not configured: {0}")]
    NotConfigured(String),

    /// Encrypting an empty value is refused; write paths drop empty
    /// incoming fields before calling the vault.
    #[error("refusing to encrypt an empty value")]
    EmptyPlaintext,

    /// A stored value failed to parse: bad base64 inside the wrapper.
    #[error("invalid stored ciphertext: {0}")]
    InvalidCiphertext(String),

    /// The encrypt call failed. Propagated as a hard failure to the write
    /// path; a write must never fall back to storing plaintext.
    #[error("encryption failed")]
    Encryption(#[source] CipherError),

    /// Decryption failed after the legacy no-context retry was exhausted
    /// (or the failure class made it ineligible).
    #[error("decryption failed")]
    Decryption(#[source] CipherError),

    /// The decrypted bytes are not valid UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

impl VaultError {
    /// Stable machine-readable code, safe to show to the record owner so
    /// they can diagnose a corrupted value or a rotated key.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::EmptyPlaintext => "empty_plaintext",
            Self::InvalidCiphertext(_) => "invalid_ciphertext",
            Self::Encryption(_) => "encryption_failure",
            Self::Decryption(_) => "decryption_failure",
            Self::InvalidUtf8 => "invalid_utf8",
        }
    }
}
