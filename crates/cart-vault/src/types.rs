//! Core types for the secret vault.

use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Authenticated (but not secret) key/value mapping bound into ciphertext
/// at encrypt time. Decryption must supply the identical mapping or fail.
///
/// The whole system uses a single fixed context, [`EncryptionContext::app`],
/// for every tenant and every secret field. Tenant isolation is therefore
/// enforced by application-layer access control on the record, not by the
/// crypto context. This is preserved for compatibility with all existing
/// stored ciphertext; scoping the context per tenant would make every
/// stored value undecryptable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionContext(BTreeMap<String, String>);

impl EncryptionContext {
    /// Creates an empty context. An empty context is equivalent to no
    /// context at all: it contributes no associated data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed system-wide context, `{"app": "stripe-cart"}`.
    #[must_use]
    pub fn app() -> Self {
        Self::new().with("app", "stripe-cart")
    }

    /// Adds a key/value pair to the context.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Canonical associated-data bytes for AEAD binding. The map is ordered,
    /// so the serialisation is deterministic. Empty contexts produce no
    /// associated data, matching ciphertext encrypted with no context.
    #[must_use]
    pub fn to_aad(&self) -> Vec<u8> {
        if self.0.is_empty() {
            return Vec::new();
        }
        // Infallible: a string map always serialises.
        serde_json::to_vec(&self.0).unwrap_or_default()
    }

    /// Returns true when the context carries no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

/// A decrypted secret with guarded exposure.
///
/// Debug output is redacted and equality is constant-time, so the value can
/// move through request handling without leaking into logs or enabling
/// timing comparisons.
#[derive(Clone)]
pub struct SecretValue {
    inner: SecretString,
}

impl SecretValue {
    /// Wraps a plaintext string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::from(value.into()),
        }
    }

    /// Exposes the plaintext. The returned reference must not be logged or
    /// stored.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Length of the plaintext in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Returns true when the plaintext is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        let a = self.inner.expose_secret().as_bytes();
        let b = other.inner.expose_secret().as_bytes();
        if a.len() != b.len() {
            return false;
        }
        a.ct_eq(b).into()
    }
}

impl Eq for SecretValue {}

/// Whether the caller has been established as the owner of the tenant
/// record a secret belongs to. Governs disclosure, not an error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The authenticated caller owns the record.
    Owner,
    /// Any other caller, including unauthenticated ones.
    NonOwner,
}

impl Ownership {
    /// Returns true for [`Ownership::Owner`].
    #[must_use]
    pub const fn is_owner(self) -> bool {
        matches!(self, Self::Owner)
    }
}

/// The shape a stored secret takes when returned to a caller.
///
/// Serialises to the wire forms served by the credential endpoints: a bare
/// string for owners, `{"masked": …, "encrypted": true}` otherwise, with an
/// `error` code added only for owners when decryption failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretDisclosure {
    /// Decrypted plaintext; owners only.
    Plaintext(String),
    /// Masked view. `masked` is `None` when the value could not be
    /// decrypted; `error` carries a diagnostic code for owners only.
    Masked {
        masked: Option<String>,
        encrypted: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_context_is_the_fixed_literal() {
        let ctx = EncryptionContext::app();
        assert_eq!(ctx.to_string(), "app=stripe-cart");
        assert_eq!(ctx.to_aad(), br#"{"app":"stripe-cart"}"#.to_vec());
    }

    #[test]
    fn empty_context_has_no_aad() {
        assert!(EncryptionContext::new().to_aad().is_empty());
    }

    #[test]
    fn aad_is_order_independent() {
        let a = EncryptionContext::new().with("b", "2").with("a", "1");
        let b = EncryptionContext::new().with("a", "1").with("b", "2");
        assert_eq!(a.to_aad(), b.to_aad());
    }

    #[test]
    fn secret_value_debug_is_redacted() {
        let value = SecretValue::new("sk_live_topsecret");
        let debug = format!("{value:?}");
        assert_eq!(debug, "[REDACTED]");
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn secret_value_constant_time_eq() {
        assert_eq!(SecretValue::new("abc"), SecretValue::new("abc"));
        assert_ne!(SecretValue::new("abc"), SecretValue::new("abd"));
        assert_ne!(SecretValue::new("abc"), SecretValue::new("ab"));
    }

    #[test]
    fn disclosure_serialises_to_wire_shapes() {
        let plain = serde_json::to_value(SecretDisclosure::Plaintext("sk_test_1".into())).unwrap();
        assert_eq!(plain, serde_json::json!("sk_test_1"));

        let masked = serde_json::to_value(SecretDisclosure::Masked {
            masked: Some("****st_1".into()),
            encrypted: true,
            error: None,
        })
        .unwrap();
        assert_eq!(
            masked,
            serde_json::json!({"masked": "****st_1", "encrypted": true})
        );

        let failed = serde_json::to_value(SecretDisclosure::Masked {
            masked: None,
            encrypted: true,
            error: Some("decryption_failure".into()),
        })
        .unwrap();
        assert_eq!(
            failed,
            serde_json::json!({"masked": null, "encrypted": true, "error": "decryption_failure"})
        );
    }
}
