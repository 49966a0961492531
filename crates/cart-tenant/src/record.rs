//! The tenant credential record and its field classification.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Which credential set is active for a tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Test,
    Live,
}

impl Mode {
    /// Field-name suffix for mode-scoped fields (`test` / `live`).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Live => "live",
        }
    }

    /// Returns true for live mode.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Explicit enumeration of the credential fields a record can carry.
///
/// This is the single place that decides which field names exist and which
/// of them are secret. Publishable keys (`pk_*`) are public by the payment
/// provider's design and are the only exemption from encryption at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    PkTest,
    PkLive,
    SkTest,
    SkLive,
    WhSecretTest,
    WhSecretLive,
    ShippoApiKey,
    EasypostApiKey,
    ShipstationApiKey,
    ShipstationApiSecret,
    EasyshipApiKey,
}

impl CredentialField {
    /// Every credential field, in record order.
    pub const ALL: [Self; 11] = [
        Self::PkTest,
        Self::PkLive,
        Self::SkTest,
        Self::SkLive,
        Self::WhSecretTest,
        Self::WhSecretLive,
        Self::ShippoApiKey,
        Self::EasypostApiKey,
        Self::ShipstationApiKey,
        Self::ShipstationApiSecret,
        Self::EasyshipApiKey,
    ];

    /// The six Stripe credential fields served by the keys endpoint.
    pub const STRIPE: [Self; 6] = [
        Self::PkTest,
        Self::PkLive,
        Self::SkTest,
        Self::SkLive,
        Self::WhSecretTest,
        Self::WhSecretLive,
    ];

    /// Stored field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PkTest => "pk_test",
            Self::PkLive => "pk_live",
            Self::SkTest => "sk_test",
            Self::SkLive => "sk_live",
            Self::WhSecretTest => "wh_secret_test",
            Self::WhSecretLive => "wh_secret_live",
            Self::ShippoApiKey => "shippo_api_key",
            Self::EasypostApiKey => "easypost_api_key",
            Self::ShipstationApiKey => "shipstation_api_key",
            Self::ShipstationApiSecret => "shipstation_api_secret",
            Self::EasyshipApiKey => "easyship_api_key",
        }
    }

    /// Resolves a stored field name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Whether the field must be encrypted at rest. Everything except the
    /// publishable keys.
    #[must_use]
    pub const fn is_secret(self) -> bool {
        !matches!(self, Self::PkTest | Self::PkLive)
    }

    /// Publishable key for a mode.
    #[must_use]
    pub const fn publishable_for(mode: Mode) -> Self {
        match mode {
            Mode::Test => Self::PkTest,
            Mode::Live => Self::PkLive,
        }
    }

    /// Secret API key for a mode.
    #[must_use]
    pub const fn secret_key_for(mode: Mode) -> Self {
        match mode {
            Mode::Test => Self::SkTest,
            Mode::Live => Self::SkLive,
        }
    }

    /// Webhook signing secret for a mode.
    #[must_use]
    pub const fn webhook_secret_for(mode: Mode) -> Self {
        match mode {
            Mode::Test => Self::WhSecretTest,
            Mode::Live => Self::WhSecretLive,
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row per tenant, keyed by client id.
///
/// Secret-classified fields hold wrapped ciphertext once written through
/// the directory; values from before encryption was introduced may still be
/// plaintext and are re-encrypted on their next write. `extra` captures the
/// schemaless attributes legacy rows carry (webhook endpoint URLs, legacy
/// secret-field aliases, branding served by the public endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    #[serde(rename = "clientID")]
    pub client_id: String,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk_test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk_live: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sk_test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sk_live: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wh_secret_test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wh_secret_live: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shippo_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easypost_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipstation_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipstation_api_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easyship_api_key: Option<String>,

    /// Soft-enable flag. Legacy rows store the strings "true"/"false".
    #[serde(default = "default_active", deserialize_with = "bool_or_string")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Attributes outside the typed schema.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TenantRecord {
    /// Creates an empty record for a client id.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            mode: Mode::default(),
            pk_test: None,
            pk_live: None,
            sk_test: None,
            sk_live: None,
            wh_secret_test: None,
            wh_secret_live: None,
            shippo_api_key: None,
            easypost_api_key: None,
            shipstation_api_key: None,
            shipstation_api_secret: None,
            easyship_api_key: None,
            active: true,
            created_at: None,
            updated_at: None,
            extra: BTreeMap::new(),
        }
    }

    /// Returns the stored value of a credential field.
    #[must_use]
    pub fn field(&self, field: CredentialField) -> Option<&str> {
        let slot = match field {
            CredentialField::PkTest => &self.pk_test,
            CredentialField::PkLive => &self.pk_live,
            CredentialField::SkTest => &self.sk_test,
            CredentialField::SkLive => &self.sk_live,
            CredentialField::WhSecretTest => &self.wh_secret_test,
            CredentialField::WhSecretLive => &self.wh_secret_live,
            CredentialField::ShippoApiKey => &self.shippo_api_key,
            CredentialField::EasypostApiKey => &self.easypost_api_key,
            CredentialField::ShipstationApiKey => &self.shipstation_api_key,
            CredentialField::ShipstationApiSecret => &self.shipstation_api_secret,
            CredentialField::EasyshipApiKey => &self.easyship_api_key,
        };
        slot.as_deref()
    }

    /// Sets a credential field to a stored value.
    pub fn set_field(&mut self, field: CredentialField, value: String) {
        let slot = match field {
            CredentialField::PkTest => &mut self.pk_test,
            CredentialField::PkLive => &mut self.pk_live,
            CredentialField::SkTest => &mut self.sk_test,
            CredentialField::SkLive => &mut self.sk_live,
            CredentialField::WhSecretTest => &mut self.wh_secret_test,
            CredentialField::WhSecretLive => &mut self.wh_secret_live,
            CredentialField::ShippoApiKey => &mut self.shippo_api_key,
            CredentialField::EasypostApiKey => &mut self.easypost_api_key,
            CredentialField::ShipstationApiKey => &mut self.shipstation_api_key,
            CredentialField::ShipstationApiSecret => &mut self.shipstation_api_secret,
            CredentialField::EasyshipApiKey => &mut self.easyship_api_key,
        };
        *slot = Some(value);
    }

    /// Returns a string attribute from the schemaless extras.
    #[must_use]
    pub fn extra_str(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(serde_json::Value::as_str)
    }
}

const fn default_active() -> bool {
    true
}

fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => b,
        Raw::Text(s) => s == "true",
    })
}

/// A partial update to a tenant record.
///
/// Only the parts present in the patch are applied; everything else keeps
/// its stored value. Secret-classified fields are encrypted on apply by the
/// directory, publishable fields stored verbatim.
#[derive(Debug, Clone, Default)]
pub struct TenantPatch {
    pub mode: Option<Mode>,
    pub active: Option<bool>,
    pub fields: Vec<(CredentialField, String)>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TenantPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential field value.
    #[must_use]
    pub fn set(mut self, field: CredentialField, value: impl Into<String>) -> Self {
        self.fields.push((field, value.into()));
        self
    }

    /// Sets the active mode.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the soft-enable flag.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Adds a schemaless attribute.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns true when the patch carries no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.active.is_none()
            && self.fields.is_empty()
            && self.extra.is_empty()
    }
}
