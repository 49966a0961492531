//! Tenant secret vault.
//!
//! Converts between plaintext credentials and their at-rest representation:
//! a ciphertext produced by an envelope cipher under a single, stable
//! encryption context, base64-encoded and wrapped as `ENCRYPTED(<base64>)`.
//! Values lacking the wrapper are treated as legacy plaintext and passed
//! through unchanged, so records written before encryption was introduced
//! keep working; every new write produces the wrapped form.
//!
//! # Disclosure
//!
//! Secrets are never returned raw to callers who do not own the record.
//! [`SecretVault::disclose`] applies the ownership gate: owners receive the
//! decrypted plaintext (or a structured error code when decryption fails),
//! everyone else receives a masked view that never contains the plaintext
//! or the stored ciphertext.
//!
//! # Example
//!
//! ```rust,ignore
//! use cart_vault::{LocalMasterKey, SecretVault};
//!
//! let vault = SecretVault::new(Arc::new(LocalMasterKey::ephemeral()));
//! let stored = vault.encrypt("sk_test_abc123").await?;
//! assert!(stored.starts_with("ENCRYPTED("));
//! let plain = vault.decrypt(&stored).await?;
//! assert_eq!(plain.expose(), "sk_test_abc123");
//! ```

mod cipher;
mod error;
mod local;
mod provider;
mod types;
mod vault;
pub mod wrapper;

pub use cipher::EnvelopeCipher;
pub use error::{CipherError, VaultError};
pub use local::LocalMasterKey;
pub use provider::{build_cipher, CipherConfig};
pub use types::{EncryptionContext, Ownership, SecretDisclosure, SecretValue};
pub use vault::{mask, SecretVault, MASK_KEEP};
