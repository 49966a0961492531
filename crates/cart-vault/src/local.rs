//! Local master-key envelope cipher.
//!
//! XChaCha20-Poly1305 with a single 32-byte master key. The encryption
//! context is bound as AEAD associated data, giving the standard property
//! that decryption under a different (or missing) context fails. Blobs are
//! `nonce || ciphertext` with a random 24-byte nonce.
//!
//! # Key file
//!
//! The key is loaded from a file holding either 32 raw bytes or 64 hex
//! characters. On Unix the file must not be readable by group or other.

use std::fs;
use std::path::Path;

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use zeroize::Zeroizing;

use crate::cipher::EnvelopeCipher;
use crate::error::CipherError;
use crate::types::EncryptionContext;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

/// Envelope cipher backed by a locally held master key.
pub struct LocalMasterKey {
    cipher: XChaCha20Poly1305,
}

impl LocalMasterKey {
    /// Loads the master key from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyUnavailable`] when the file is missing,
    /// malformed, or has insecure permissions.
    pub fn from_key_file(path: impl AsRef<Path>) -> Result<Self, CipherError> {
        let path = path.as_ref();
        check_permissions(path)?;

        let raw = fs::read(path).map_err(|e| {
            CipherError::KeyUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let raw = Zeroizing::new(raw);

        let key = Zeroizing::new(parse_key(&raw).ok_or_else(|| {
            CipherError::KeyUnavailable(format!(
                "{} must hold 32 raw bytes or 64 hex characters",
                path.display()
            ))
        })?);

        Ok(Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key.as_ref())),
        })
    }

    /// Generates a throwaway in-process key. For tests and local
    /// development; ciphertext does not survive the process.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(&XChaCha20Poly1305::generate_key(&mut OsRng)),
        }
    }

    /// Writes a freshly generated hex-encoded key to `path` with owner-only
    /// permissions. Refuses to overwrite an existing file.
    pub fn generate_key_file(path: impl AsRef<Path>) -> Result<(), CipherError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(CipherError::KeyUnavailable(format!(
                "refusing to overwrite existing key file {}",
                path.display()
            )));
        }

        let key = XChaCha20Poly1305::generate_key(&mut OsRng);
        let encoded = Zeroizing::new(hex_encode(key.as_slice()));
        fs::write(path, encoded.as_bytes()).map_err(|e| {
            CipherError::KeyUnavailable(format!("cannot write {}: {e}", path.display()))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                CipherError::KeyUnavailable(format!(
                    "cannot set permissions on {}: {e}",
                    path.display()
                ))
            })?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl EnvelopeCipher for LocalMasterKey {
    async fn encrypt(
        &self,
        plaintext: &[u8],
        context: &EncryptionContext,
    ) -> Result<Vec<u8>, CipherError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let aad = context.to_aad();

        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| CipherError::Backend("AEAD encryption failed".to_owned()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: Option<&EncryptionContext>,
    ) -> Result<Vec<u8>, CipherError> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::InvalidCiphertext);
        }

        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        let aad = context.map(EncryptionContext::to_aad).unwrap_or_default();

        self.cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: &aad,
                },
            )
            .map_err(|_| CipherError::InvalidCiphertext)
    }
}

impl std::fmt::Debug for LocalMasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMasterKey").finish_non_exhaustive()
    }
}

fn parse_key(raw: &[u8]) -> Option<[u8; KEY_LEN]> {
    if raw.len() == KEY_LEN {
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(raw);
        return Some(key);
    }

    let text = std::str::from_utf8(raw).ok()?.trim();
    if text.len() != KEY_LEN * 2 {
        return None;
    }

    let mut key = [0u8; KEY_LEN];
    for (i, chunk) in text.as_bytes().chunks(2).enumerate() {
        let hi = hex_digit(chunk[0])?;
        let lo = hex_digit(chunk[1])?;
        key[i] = hi << 4 | lo;
    }
    Some(key)
}

const fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // Infallible on String.
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<(), CipherError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|e| {
        CipherError::KeyUnavailable(format!("cannot stat {}: {e}", path.display()))
    })?;

    let mode = metadata.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(CipherError::KeyUnavailable(format!(
            "insecure key file permissions: {} has mode {mode:o}, expected owner-only access",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<(), CipherError> {
    Ok(())
}
