//! Tenant directory: the service combining the record store and the vault.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cart_vault::{Ownership, SecretDisclosure, SecretValue, SecretVault};

use crate::error::TenantError;
use crate::record::{CredentialField, Mode, TenantPatch, TenantRecord};
use crate::store::TenantStore;

/// Ordered candidate field names for the webhook signing secret, canonical
/// field first, legacy alias second. The first candidate holding a
/// non-empty value wins. This list is the single source of truth for which
/// names a legacy record may use.
const fn webhook_secret_candidates(mode: Mode) -> [&'static str; 2] {
    match mode {
        Mode::Test => ["wh_secret_test", "whsec_test"],
        Mode::Live => ["wh_secret_live", "whsec_live"],
    }
}

/// A shipping-carrier integration a tenant can hold credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarrierProvider {
    Shippo,
    Easypost,
    Shipstation,
    Easyship,
}

/// Decrypted carrier credentials, shaped per provider.
#[derive(Debug)]
pub enum CarrierCredentials {
    /// Single API key (Shippo, EasyPost, Easyship).
    ApiKey(SecretValue),
    /// Key + secret pair (ShipStation basic auth).
    KeyPair {
        key: SecretValue,
        secret: SecretValue,
    },
}

/// Mode-selected credentials for the checkout path. Only served for active
/// records.
#[derive(Debug)]
pub struct ActiveCredentials {
    pub client_id: String,
    pub mode: Mode,
    pub publishable_key: String,
    pub secret_key: SecretValue,
}

/// Per-field disclosure view of a tenant's Stripe credentials, ready for
/// response shaping. Absent fields serialise as `null`, exactly as the
/// credential endpoint has always returned them.
#[derive(Debug, Serialize)]
pub struct CredentialView {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub mode: Mode,
    pub pk_test: Option<SecretDisclosure>,
    pub pk_live: Option<SecretDisclosure>,
    pub sk_test: Option<SecretDisclosure>,
    pub sk_live: Option<SecretDisclosure>,
    pub wh_secret_test: Option<SecretDisclosure>,
    pub wh_secret_live: Option<SecretDisclosure>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    pub active: bool,
}

/// Directory over tenant records.
///
/// All credential reads and writes go through here so that the encryption
/// invariant holds in one place: a secret-classified field never reaches
/// the store in plaintext, and never leaves it undisclosed.
pub struct TenantDirectory {
    store: Arc<dyn TenantStore>,
    vault: Arc<SecretVault>,
}

impl TenantDirectory {
    /// Creates a directory over a store and a vault.
    #[must_use]
    pub fn new(store: Arc<dyn TenantStore>, vault: Arc<SecretVault>) -> Self {
        Self { store, vault }
    }

    /// The vault this directory encrypts and discloses through.
    #[must_use]
    pub fn vault(&self) -> &SecretVault {
        &self.vault
    }

    /// Fetches a record, or `None` when absent.
    pub async fn get(&self, client_id: &str) -> Result<Option<TenantRecord>, TenantError> {
        Ok(self.store.get(client_id).await?)
    }

    /// Fetches a record, failing with [`TenantError::NotFound`] when absent.
    pub async fn require(&self, client_id: &str) -> Result<TenantRecord, TenantError> {
        self.get(client_id)
            .await?
            .ok_or_else(|| TenantError::NotFound(client_id.to_owned()))
    }

    /// Applies a partial update with read-merge-write semantics.
    ///
    /// Fields present in the patch overwrite stored values; everything else
    /// is retained. Secret-classified fields are encrypted before the write
    /// unless the incoming value already carries the wrapper (idempotent
    /// passthrough); publishable fields are stored verbatim. Empty incoming
    /// values are dropped, matching the long-standing caller convention
    /// that an empty field means "no change".
    ///
    /// `created_at` is set on first write and preserved afterwards;
    /// `updated_at` is refreshed on every write. An encryption failure
    /// aborts the entire write before anything reaches the store.
    ///
    /// Concurrent patches to the same client id are last-writer-wins at the
    /// record level; no optimistic-concurrency token is used.
    pub async fn upsert_partial(
        &self,
        client_id: &str,
        patch: TenantPatch,
    ) -> Result<TenantRecord, TenantError> {
        let now = Utc::now();
        let mut record = self
            .store
            .get(client_id)
            .await?
            .unwrap_or_else(|| TenantRecord::new(client_id));

        if let Some(mode) = patch.mode {
            record.mode = mode;
        }
        if let Some(active) = patch.active {
            record.active = active;
        }

        let mut updated_fields = Vec::with_capacity(patch.fields.len());
        for (field, value) in patch.fields {
            if value.is_empty() {
                tracing::debug!(field = field.name(), "skipping empty credential value");
                continue;
            }

            let stored = if field.is_secret() {
                self.vault.encrypt_if_needed(&value).await?
            } else {
                value
            };
            record.set_field(field, stored);
            updated_fields.push(field.name());
        }

        for (key, value) in patch.extra {
            record.extra.insert(key, value);
        }

        if record.created_at.is_none() {
            record.created_at = Some(now);
        }
        record.updated_at = Some(now);

        self.store.put(&record).await?;

        tracing::info!(
            client_id = %record.client_id,
            fields = ?updated_fields,
            "tenant record updated"
        );
        Ok(record)
    }

    /// Builds the ownership-gated credential view for a tenant.
    ///
    /// Publishable keys are returned as plaintext to any caller; secret
    /// fields go through the vault's disclosure policy. A field that fails
    /// to decrypt yields an unavailable slot without failing the rest of
    /// the view.
    pub async fn credential_view(
        &self,
        client_id: &str,
        ownership: Ownership,
    ) -> Result<Option<CredentialView>, TenantError> {
        let Some(record) = self.store.get(client_id).await? else {
            return Ok(None);
        };

        let mut view = CredentialView {
            client_id: record.client_id.clone(),
            mode: record.mode,
            pk_test: None,
            pk_live: None,
            sk_test: None,
            sk_live: None,
            wh_secret_test: None,
            wh_secret_live: None,
            updated_at: record.updated_at,
            active: record.active,
        };

        for field in CredentialField::STRIPE {
            let Some(stored) = record.field(field) else {
                continue;
            };

            let disclosure = if field.is_secret() {
                self.vault.disclose(stored, ownership).await
            } else {
                SecretDisclosure::Plaintext(stored.to_owned())
            };

            let slot = match field {
                CredentialField::PkTest => &mut view.pk_test,
                CredentialField::PkLive => &mut view.pk_live,
                CredentialField::SkTest => &mut view.sk_test,
                CredentialField::SkLive => &mut view.sk_live,
                CredentialField::WhSecretTest => &mut view.wh_secret_test,
                CredentialField::WhSecretLive => &mut view.wh_secret_live,
                _ => continue,
            };
            *slot = Some(disclosure);
        }

        Ok(Some(view))
    }

    /// Resolves and decrypts the webhook signing secret for a tenant.
    ///
    /// Candidates are tried in the order given by the shared list: the
    /// canonical `wh_secret_<mode>` field, then the legacy `whsec_<mode>`
    /// alias some older rows carry. `mode` defaults to the record's active
    /// mode.
    pub async fn resolve_webhook_secret(
        &self,
        client_id: &str,
        mode: Option<Mode>,
    ) -> Result<SecretValue, TenantError> {
        let record = self.require(client_id).await?;
        let mode = mode.unwrap_or(record.mode);

        for name in webhook_secret_candidates(mode) {
            let stored = match CredentialField::from_name(name) {
                Some(field) => record.field(field),
                None => record.extra_str(name),
            };

            if let Some(stored) = stored.filter(|s| !s.is_empty()) {
                tracing::debug!(client_id, field = name, %mode, "webhook secret field resolved");
                return Ok(self.vault.decrypt(stored).await?);
            }
        }

        Err(TenantError::FieldNotSet(format!(
            "webhook secret for mode '{mode}'"
        )))
    }

    /// The webhook endpoint URL configured for a mode, if any.
    #[must_use]
    pub fn webhook_endpoint(record: &TenantRecord, mode: Mode) -> Option<String> {
        record
            .extra_str(&format!("webhook_url_{}", mode.suffix()))
            .map(str::to_owned)
    }

    /// Resolves and decrypts a tenant's credentials for a shipping carrier.
    pub async fn resolve_carrier_credentials(
        &self,
        client_id: &str,
        provider: CarrierProvider,
    ) -> Result<CarrierCredentials, TenantError> {
        let record = self.require(client_id).await?;

        let decrypt = |field: CredentialField| {
            let stored = record.field(field).filter(|s| !s.is_empty());
            async move {
                match stored {
                    Some(stored) => Ok(self.vault.decrypt(stored).await?),
                    None => Err(TenantError::FieldNotSet(field.name().to_owned())),
                }
            }
        };

        match provider {
            CarrierProvider::Shippo => {
                Ok(CarrierCredentials::ApiKey(decrypt(CredentialField::ShippoApiKey).await?))
            }
            CarrierProvider::Easypost => Ok(CarrierCredentials::ApiKey(
                decrypt(CredentialField::EasypostApiKey).await?,
            )),
            CarrierProvider::Easyship => Ok(CarrierCredentials::ApiKey(
                decrypt(CredentialField::EasyshipApiKey).await?,
            )),
            CarrierProvider::Shipstation => Ok(CarrierCredentials::KeyPair {
                key: decrypt(CredentialField::ShipstationApiKey).await?,
                secret: decrypt(CredentialField::ShipstationApiSecret).await?,
            }),
        }
    }

    /// Loads the mode-selected credentials for the checkout path. The
    /// record must exist and be active.
    pub async fn load_active(&self, client_id: &str) -> Result<ActiveCredentials, TenantError> {
        let record = self.require(client_id).await?;
        if !record.active {
            return Err(TenantError::NotFound(client_id.to_owned()));
        }

        let mode = record.mode;
        let publishable_key = record
            .field(CredentialField::publishable_for(mode))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                TenantError::FieldNotSet(CredentialField::publishable_for(mode).name().to_owned())
            })?
            .to_owned();

        let sk_field = CredentialField::secret_key_for(mode);
        let stored_sk = record
            .field(sk_field)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TenantError::FieldNotSet(sk_field.name().to_owned()))?;
        let secret_key = self.vault.decrypt(stored_sk).await?;

        Ok(ActiveCredentials {
            client_id: record.client_id,
            mode,
            publishable_key,
            secret_key,
        })
    }
}

impl std::fmt::Debug for TenantDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantDirectory").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTenantStore;
    use cart_vault::{wrapper, LocalMasterKey};

    fn directory() -> TenantDirectory {
        let store = Arc::new(MemoryTenantStore::new());
        let vault = Arc::new(SecretVault::new(Arc::new(LocalMasterKey::ephemeral())));
        TenantDirectory::new(store, vault)
    }

    #[tokio::test]
    async fn secrets_are_encrypted_at_rest_publishable_keys_are_not() {
        let dir = directory();
        let patch = TenantPatch::new()
            .set(CredentialField::PkTest, "pk_test_visible")
            .set(CredentialField::SkTest, "sk_test_hidden");

        let record = dir.upsert_partial("acme", patch).await.unwrap();

        assert_eq!(record.pk_test.as_deref(), Some("pk_test_visible"));
        let sk = record.sk_test.as_deref().unwrap();
        assert!(wrapper::is_wrapped(sk));
        assert!(!sk.contains("sk_test_hidden"));
    }

    #[tokio::test]
    async fn partial_merge_retains_unmentioned_fields() {
        let dir = directory();

        dir.upsert_partial(
            "acme",
            TenantPatch::new()
                .set(CredentialField::PkTest, "pk_test_1")
                .set(CredentialField::SkTest, "sk_test_1"),
        )
        .await
        .unwrap();

        let before = dir.require("acme").await.unwrap();

        let after = dir
            .upsert_partial(
                "acme",
                TenantPatch::new().set(CredentialField::SkLive, "sk_live_1"),
            )
            .await
            .unwrap();

        assert_eq!(after.pk_test, before.pk_test);
        assert_eq!(after.sk_test, before.sk_test);
        assert!(after.sk_live.is_some());
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn already_wrapped_values_pass_through_unchanged() {
        let dir = directory();
        let wrapped = dir.vault().encrypt("whsec_original").await.unwrap();

        let record = dir
            .upsert_partial(
                "acme",
                TenantPatch::new().set(CredentialField::WhSecretTest, wrapped.clone()),
            )
            .await
            .unwrap();

        assert_eq!(record.wh_secret_test.as_deref(), Some(wrapped.as_str()));
    }

    #[tokio::test]
    async fn empty_values_are_dropped() {
        let dir = directory();

        dir.upsert_partial(
            "acme",
            TenantPatch::new().set(CredentialField::SkTest, "sk_test_1"),
        )
        .await
        .unwrap();

        let record = dir
            .upsert_partial("acme", TenantPatch::new().set(CredentialField::SkTest, ""))
            .await
            .unwrap();

        // Unchanged, not cleared.
        assert!(record.sk_test.is_some());
    }

    #[tokio::test]
    async fn legacy_plaintext_is_reencrypted_on_next_write() {
        let dir = directory();

        // A row written before encryption was introduced.
        let mut legacy = TenantRecord::new("acme");
        legacy.sk_test = Some("sk_test_plain".into());
        dir.store.put(&legacy).await.unwrap();

        let record = dir
            .upsert_partial(
                "acme",
                TenantPatch::new().set(CredentialField::SkTest, "sk_test_rotated"),
            )
            .await
            .unwrap();

        assert!(wrapper::is_wrapped(record.sk_test.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn owner_view_has_plaintext_non_owner_view_is_masked() {
        let dir = directory();
        dir.upsert_partial(
            "acme",
            TenantPatch::new()
                .set(CredentialField::PkTest, "pk_test_abc")
                .set(CredentialField::SkTest, "sk_test_secret99"),
        )
        .await
        .unwrap();

        let owner = dir
            .credential_view("acme", Ownership::Owner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            owner.sk_test,
            Some(SecretDisclosure::Plaintext("sk_test_secret99".into()))
        );
        assert_eq!(
            owner.pk_test,
            Some(SecretDisclosure::Plaintext("pk_test_abc".into()))
        );

        let other = dir
            .credential_view("acme", Ownership::NonOwner)
            .await
            .unwrap()
            .unwrap();
        // Publishable key still plaintext for anyone.
        assert_eq!(
            other.pk_test,
            Some(SecretDisclosure::Plaintext("pk_test_abc".into()))
        );
        let Some(SecretDisclosure::Masked {
            masked: Some(masked),
            encrypted: true,
            error: None,
        }) = other.sk_test
        else {
            panic!("expected masked secret for non-owner");
        };
        assert!(masked.ends_with("et99"));
        assert!(!masked.contains("sk_test_secret99"));
    }

    #[tokio::test]
    async fn one_corrupt_field_does_not_fail_the_view() {
        let dir = directory();
        dir.upsert_partial(
            "acme",
            TenantPatch::new().set(CredentialField::SkTest, "sk_test_good"),
        )
        .await
        .unwrap();

        // Corrupt the live key behind the directory's back.
        let mut record = dir.require("acme").await.unwrap();
        record.sk_live = Some("ENCRYPTED(%%%not-base64%%%)".into());
        dir.store.put(&record).await.unwrap();

        let view = dir
            .credential_view("acme", Ownership::Owner)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            view.sk_test,
            Some(SecretDisclosure::Plaintext("sk_test_good".into()))
        );
        assert_eq!(
            view.sk_live,
            Some(SecretDisclosure::Masked {
                masked: None,
                encrypted: true,
                error: Some("invalid_ciphertext".into()),
            })
        );
    }

    #[tokio::test]
    async fn missing_record_view_is_none() {
        let dir = directory();
        let view = dir
            .credential_view("nobody", Ownership::Owner)
            .await
            .unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn webhook_secret_prefers_canonical_field() {
        let dir = directory();
        let canonical = dir.vault().encrypt("whsec_canonical").await.unwrap();
        let legacy = dir.vault().encrypt("whsec_legacy").await.unwrap();

        dir.upsert_partial(
            "acme",
            TenantPatch::new()
                .set(CredentialField::WhSecretTest, canonical)
                .with_extra("whsec_test", serde_json::json!(legacy)),
        )
        .await
        .unwrap();

        let secret = dir.resolve_webhook_secret("acme", None).await.unwrap();
        assert_eq!(secret.expose(), "whsec_canonical");
    }

    #[tokio::test]
    async fn webhook_secret_falls_back_to_legacy_alias() {
        let dir = directory();
        let legacy = dir.vault().encrypt("whsec_from_alias").await.unwrap();

        dir.upsert_partial(
            "acme",
            TenantPatch::new().with_extra("whsec_test", serde_json::json!(legacy)),
        )
        .await
        .unwrap();

        let secret = dir.resolve_webhook_secret("acme", None).await.unwrap();
        assert_eq!(secret.expose(), "whsec_from_alias");
    }

    #[tokio::test]
    async fn webhook_secret_respects_mode() {
        let dir = directory();
        dir.upsert_partial(
            "acme",
            TenantPatch::new()
                .set(CredentialField::WhSecretTest, "whsec_t")
                .set(CredentialField::WhSecretLive, "whsec_l"),
        )
        .await
        .unwrap();

        let live = dir
            .resolve_webhook_secret("acme", Some(Mode::Live))
            .await
            .unwrap();
        assert_eq!(live.expose(), "whsec_l");
    }

    #[tokio::test]
    async fn webhook_secret_absent_is_field_not_set() {
        let dir = directory();
        dir.upsert_partial("acme", TenantPatch::new().with_active(true))
            .await
            .unwrap();

        let err = dir.resolve_webhook_secret("acme", None).await.unwrap_err();
        assert!(matches!(err, TenantError::FieldNotSet(_)));
    }

    #[tokio::test]
    async fn carrier_credentials_shipstation_requires_pair() {
        let dir = directory();
        dir.upsert_partial(
            "acme",
            TenantPatch::new().set(CredentialField::ShipstationApiKey, "ss_key"),
        )
        .await
        .unwrap();

        let err = dir
            .resolve_carrier_credentials("acme", CarrierProvider::Shipstation)
            .await
            .unwrap_err();
        assert!(matches!(err, TenantError::FieldNotSet(_)));

        dir.upsert_partial(
            "acme",
            TenantPatch::new().set(CredentialField::ShipstationApiSecret, "ss_secret"),
        )
        .await
        .unwrap();

        let creds = dir
            .resolve_carrier_credentials("acme", CarrierProvider::Shipstation)
            .await
            .unwrap();
        let CarrierCredentials::KeyPair { key, secret } = creds else {
            panic!("expected key pair");
        };
        assert_eq!(key.expose(), "ss_key");
        assert_eq!(secret.expose(), "ss_secret");
    }

    #[tokio::test]
    async fn carrier_credentials_single_key() {
        let dir = directory();
        dir.upsert_partial(
            "acme",
            TenantPatch::new().set(CredentialField::ShippoApiKey, "shippo_live_k"),
        )
        .await
        .unwrap();

        let creds = dir
            .resolve_carrier_credentials("acme", CarrierProvider::Shippo)
            .await
            .unwrap();
        let CarrierCredentials::ApiKey(key) = creds else {
            panic!("expected single key");
        };
        assert_eq!(key.expose(), "shippo_live_k");
    }

    #[tokio::test]
    async fn load_active_selects_by_mode_and_requires_active() {
        let dir = directory();
        dir.upsert_partial(
            "acme",
            TenantPatch::new()
                .with_mode(Mode::Live)
                .set(CredentialField::PkLive, "pk_live_1")
                .set(CredentialField::SkLive, "sk_live_1"),
        )
        .await
        .unwrap();

        let creds = dir.load_active("acme").await.unwrap();
        assert_eq!(creds.mode, Mode::Live);
        assert_eq!(creds.publishable_key, "pk_live_1");
        assert_eq!(creds.secret_key.expose(), "sk_live_1");

        dir.upsert_partial("acme", TenantPatch::new().with_active(false))
            .await
            .unwrap();
        let err = dir.load_active("acme").await.unwrap_err();
        assert!(matches!(err, TenantError::NotFound(_)));
    }

    #[tokio::test]
    async fn load_active_unknown_tenant_is_not_found() {
        let dir = directory();
        let err = dir.load_active("ghost").await.unwrap_err();
        assert!(matches!(err, TenantError::NotFound(_)));
    }
}
