//! Envelope cipher trait.

use async_trait::async_trait;

use crate::error::CipherError;
use crate::types::EncryptionContext;

/// Backend trait for the envelope-encryption service.
///
/// One implementation wraps the managed key service of the deployment
/// platform; [`LocalMasterKey`](crate::LocalMasterKey) provides a
/// self-contained backend for development and tests. Every call is a single
/// synchronous round-trip with no shared mutable state, so operations are
/// independent and safe to retry.
#[async_trait]
pub trait EnvelopeCipher: Send + Sync {
    /// Encrypts `plaintext`, binding `context` into the ciphertext.
    async fn encrypt(
        &self,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, CipherError>;

    /// Decrypts `ciphertext`. When `context` is `Some`, the identical
    /// mapping used at encrypt time must be supplied or decryption fails
    /// with [`CipherError::InvalidCiphertext`]. `None` decrypts ciphertext
    /// produced before the context convention was introduced.
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: Option<&EncryptionContext>,
    ) -> Result<Vec<u8>, CipherError>;
}
