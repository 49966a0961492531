//! The secret vault: wrap, unwrap, mask, disclose.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::cipher::EnvelopeCipher;
use crate::error::{CipherError, VaultError};
use crate::types::{EncryptionContext, Ownership, SecretDisclosure, SecretValue};
use crate::wrapper;

/// Characters preserved at the tail of a masked secret.
pub const MASK_KEEP: usize = 4;

/// Vault over an envelope cipher and the fixed system encryption context.
///
/// One vault serves every tenant: the context is not tenant-scoped, so any
/// component holding the master key can decrypt any tenant's secret. Tenant
/// isolation is the responsibility of the access-control layer in front of
/// [`SecretVault::disclose`].
pub struct SecretVault {
    cipher: Arc<dyn EnvelopeCipher>,
    context: EncryptionContext,
}

impl SecretVault {
    /// Creates a vault using the fixed system context
    /// ([`EncryptionContext::app`]).
    #[must_use]
    pub fn new(cipher: Arc<dyn EnvelopeCipher>) -> Self {
        Self::with_context(cipher, EncryptionContext::app())
    }

    /// Creates a vault with an explicit context.
    #[must_use]
    pub fn with_context(cipher: Arc<dyn EnvelopeCipher>, context: EncryptionContext) -> Self {
        Self { cipher, context }
    }

    /// Encrypts a plaintext secret into the wrapped at-rest form.
    ///
    /// # Errors
    ///
    /// [`VaultError::EmptyPlaintext`] for empty input, and
    /// [`VaultError::Encryption`] when the cipher fails. Encryption failures
    /// must abort the enclosing write; a write path never stores plaintext
    /// as a fallback.
    pub async fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        if plaintext.is_empty() {
            return Err(VaultError::EmptyPlaintext);
        }

        let blob = self
            .cipher
            .encrypt(plaintext.as_bytes(), &self.context)
            .await
            .map_err(VaultError::Encryption)?;

        Ok(wrapper::wrap(&BASE64.encode(blob)))
    }

    /// Encrypts `value` unless it already carries the wrapper, in which
    /// case it is returned unchanged. This keeps writes idempotent: a
    /// caller replaying an already-wrapped value never double-wraps it.
    pub async fn encrypt_if_needed(&self, value: &str) -> Result<String, VaultError> {
        if wrapper::is_wrapped(value) {
            return Ok(value.to_owned());
        }
        self.encrypt(value).await
    }

    /// Decrypts a stored value.
    ///
    /// Values without the wrapper are returned unchanged: that is the
    /// deliberate backward-compatibility path for records written before
    /// encryption was introduced. Wrapped values are base64-decoded and
    /// decrypted under the vault context; if the cipher rejects the
    /// ciphertext, one retry is made without a context to cover blobs
    /// encrypted before the context convention existed. Any other failure
    /// class is not retried.
    pub async fn decrypt(&self, stored: &str) -> Result<SecretValue, VaultError> {
        let Some(inner) = wrapper::unwrap(stored) else {
            return Ok(SecretValue::new(stored));
        };

        let blob = BASE64
            .decode(inner)
            .map_err(|e| VaultError::InvalidCiphertext(format!("base64: {e}")))?;

        let plaintext = match self.cipher.decrypt(&blob, Some(&self.context)).await {
            Ok(plaintext) => plaintext,
            Err(CipherError::InvalidCiphertext) => {
                tracing::debug!(
                    context = %self.context,
                    "context-bound decrypt rejected, retrying without context for legacy ciphertext"
                );
                self.cipher
                    .decrypt(&blob, None)
                    .await
                    .map_err(VaultError::Decryption)?
            }
            Err(e) => return Err(VaultError::Decryption(e)),
        };

        String::from_utf8(plaintext)
            .map(SecretValue::new)
            .map_err(|_| VaultError::InvalidUtf8)
    }

    /// Applies the ownership-gated read policy to a stored secret.
    ///
    /// Owners receive the decrypted plaintext; everyone else a masked view.
    /// A decryption failure never propagates: owners get a structured error
    /// code in the masked slot so they can diagnose a corrupted value or a
    /// rotated key, non-owners get a bare masked-null with no diagnostic
    /// detail. One failing field must not take down a multi-field response,
    /// so this method is infallible by design.
    pub async fn disclose(&self, stored: &str, ownership: Ownership) -> SecretDisclosure {
        match self.decrypt(stored).await {
            Ok(plaintext) => match ownership {
                Ownership::Owner => SecretDisclosure::Plaintext(plaintext.expose().to_owned()),
                Ownership::NonOwner => SecretDisclosure::Masked {
                    masked: Some(mask(plaintext.expose(), MASK_KEEP)),
                    encrypted: true,
                    error: None,
                },
            },
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "stored secret could not be disclosed");
                SecretDisclosure::Masked {
                    masked: None,
                    encrypted: true,
                    error: ownership.is_owner().then(|| e.error_code().to_owned()),
                }
            }
        }
    }
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretVault")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Masks a secret for display: all but the last `keep` characters replaced
/// with asterisks. Secrets no longer than `keep` are fully masked, since a
/// string that short cannot safely expose a suffix.
///
/// Must be applied exactly once, at the response-shaping boundary; masking
/// an already-masked value is not idempotent.
#[must_use]
pub fn mask(secret: &str, keep: usize) -> String {
    let len = secret.chars().count();
    if len <= keep {
        return "*".repeat(len);
    }

    let mut out = "*".repeat(len - keep);
    out.extend(secret.chars().skip(len - keep));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalMasterKey;

    fn vault() -> SecretVault {
        SecretVault::new(Arc::new(LocalMasterKey::ephemeral()))
    }

    #[tokio::test]
    async fn round_trip() {
        let vault = vault();
        for secret in ["sk_test_abc123", "whsec_9f8e7d", "x", "with spaces and ünïcode"] {
            let stored = vault.encrypt(secret).await.unwrap();
            let plain = vault.decrypt(&stored).await.unwrap();
            assert_eq!(plain.expose(), secret);
        }
    }

    #[tokio::test]
    async fn wrapper_grammar() {
        let vault = vault();
        let stored = vault.encrypt("sk_live_xyz").await.unwrap();

        assert!(stored.starts_with("ENCRYPTED("));
        assert!(stored.ends_with(')'));

        let inner = wrapper::unwrap(&stored).unwrap();
        assert!(!inner.is_empty());
        assert!(BASE64.decode(inner).is_ok());
    }

    #[tokio::test]
    async fn empty_plaintext_is_refused() {
        let err = vault().encrypt("").await.unwrap_err();
        assert!(matches!(err, VaultError::EmptyPlaintext));
    }

    #[tokio::test]
    async fn no_double_wrapping() {
        let vault = vault();
        let stored = vault.encrypt("sk_test_abc").await.unwrap();

        let again = vault.encrypt_if_needed(&stored).await.unwrap();
        assert_eq!(again, stored);

        let fresh = vault.encrypt_if_needed("sk_test_abc").await.unwrap();
        assert!(wrapper::is_wrapped(&fresh));
        assert_ne!(fresh, "sk_test_abc");
    }

    #[tokio::test]
    async fn legacy_plaintext_passthrough() {
        let vault = vault();
        for legacy in ["sk_test_plain_legacy", "whsec_unwrapped", "ENCRYPTED(", "ENCRYPTED"] {
            let plain = vault.decrypt(legacy).await.unwrap();
            assert_eq!(plain.expose(), legacy);
        }
    }

    #[tokio::test]
    async fn malformed_base64_is_invalid_ciphertext() {
        let vault = vault();
        let err = vault.decrypt("ENCRYPTED(not-valid-base64!!!)").await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidCiphertext(_)));
    }

    #[tokio::test]
    async fn context_binding() {
        let cipher = Arc::new(LocalMasterKey::ephemeral());
        let vault_a = SecretVault::new(Arc::clone(&cipher) as Arc<dyn EnvelopeCipher>);
        let vault_b = SecretVault::with_context(
            cipher,
            EncryptionContext::new().with("app", "another-app"),
        );

        let stored = vault_a.encrypt("bound-secret").await.unwrap();

        // The other context fails its own bound decrypt, falls back to a
        // contextless decrypt, and that fails too: the ciphertext carries
        // the original context.
        let err = vault_b.decrypt(&stored).await.unwrap_err();
        assert!(matches!(err, VaultError::Decryption(_)));
    }

    #[tokio::test]
    async fn legacy_contextless_ciphertext_decrypts_via_fallback() {
        let cipher = Arc::new(LocalMasterKey::ephemeral());
        let legacy_vault = SecretVault::with_context(
            Arc::clone(&cipher) as Arc<dyn EnvelopeCipher>,
            EncryptionContext::new(),
        );
        let vault = SecretVault::new(cipher);

        // Written before the context convention: no associated data.
        let stored = legacy_vault.encrypt("pre-context-secret").await.unwrap();

        let plain = vault.decrypt(&stored).await.unwrap();
        assert_eq!(plain.expose(), "pre-context-secret");
    }

    #[test]
    fn mask_boundary_cases() {
        assert_eq!(mask("ab", 4), "**");
        assert_eq!(mask("abcd", 4), "****");
        assert_eq!(mask("abcdef", 4), "**cdef");
        assert_eq!(mask("", 4), "");
        assert_eq!(mask("sk_test_abc123", 4), "**********c123");
    }

    #[tokio::test]
    async fn disclose_owner_gets_plaintext() {
        let vault = vault();
        let stored = vault.encrypt("sk_test_abc123").await.unwrap();

        let disclosure = vault.disclose(&stored, Ownership::Owner).await;
        assert_eq!(
            disclosure,
            SecretDisclosure::Plaintext("sk_test_abc123".into())
        );
    }

    #[tokio::test]
    async fn disclose_non_owner_gets_mask_only() {
        let vault = vault();
        let stored = vault.encrypt("sk_test_abc123").await.unwrap();

        let disclosure = vault.disclose(&stored, Ownership::NonOwner).await;
        let SecretDisclosure::Masked {
            masked: Some(masked),
            encrypted: true,
            error: None,
        } = disclosure
        else {
            panic!("expected masked disclosure, got {disclosure:?}");
        };

        assert_eq!(masked, "**********c123");
        assert!(!masked.contains("sk_test"));
    }

    #[tokio::test]
    async fn disclose_failure_shapes() {
        let vault = vault();
        let corrupt = "ENCRYPTED(!!!not base64!!!)";

        let owner = vault.disclose(corrupt, Ownership::Owner).await;
        assert_eq!(
            owner,
            SecretDisclosure::Masked {
                masked: None,
                encrypted: true,
                error: Some("invalid_ciphertext".into()),
            }
        );

        let other = vault.disclose(corrupt, Ownership::NonOwner).await;
        assert_eq!(
            other,
            SecretDisclosure::Masked {
                masked: None,
                encrypted: true,
                error: None,
            }
        );
    }
}
