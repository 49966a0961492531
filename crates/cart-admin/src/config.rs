//! Deployment configuration for the admin service.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use thiserror::Error;

use cart_tenant::StoreConfig;
use cart_vault::CipherConfig;

/// Errors raised while loading deployment configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Configuration error: {0}")]
    Figment(Box<figment::Error>),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<figment::Error> for ConfigFileError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Deployment environment name (`dev` | `prod`). Selects which
    /// config-store scope overlays the global one.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Envelope cipher backend for the secret vault.
    #[serde(default)]
    pub vault: CipherConfig,

    /// Tenant record store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Application-config cache settings.
    #[serde(default)]
    pub app_config: AppConfigSettings,

    /// JWT bearer authentication. When absent every caller is anonymous
    /// (a non-owner); owner-only routes are then unreachable, which is
    /// acceptable only for local development.
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            environment: default_environment(),
            vault: CipherConfig::default(),
            store: StoreConfig::default(),
            app_config: AppConfigSettings::default(),
            auth: None,
        }
    }
}

impl AdminConfig {
    /// Loads configuration from the default path (`cart-admin.toml`).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from("cart-admin.toml")
    }

    /// Loads configuration from a file path. Environment variables prefixed
    /// with `CART_` override file settings (`CART_SERVER__BIND_ADDRESS`,
    /// `CART_ENVIRONMENT`, ...).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigFileError::FileNotFound(path.display().to_string()));
        }

        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("CART_").split("__").lowercase(false));

        figment.extract::<Self>().map_err(ConfigFileError::from)
    }

    /// Parses configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigFileError> {
        let figment = Figment::new().merge(Toml::string(content));
        figment.extract::<Self>().map_err(ConfigFileError::from)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address and port to bind the server to.
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

const fn default_bind_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8471)
}

fn default_environment() -> String {
    "dev".to_owned()
}

/// Application-config cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfigSettings {
    /// How long a merged snapshot is served before re-reading the store.
    #[serde(default = "default_config_ttl", with = "humantime_serde")]
    pub ttl: Duration,

    /// Global-scope rows seeded into the config store at startup.
    #[serde(default)]
    pub seed: BTreeMap<String, serde_json::Value>,
}

impl Default for AppConfigSettings {
    fn default() -> Self {
        Self {
            ttl: default_config_ttl(),
            seed: BTreeMap::new(),
        }
    }
}

const fn default_config_ttl() -> Duration {
    Duration::from_secs(60)
}

/// JWT bearer authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret key for HMAC signature verification.
    pub secret: String,

    /// HMAC algorithm to use for verification.
    #[serde(default)]
    pub algorithm: AuthAlgorithm,

    /// Expected token issuer (`iss` claim).
    #[serde(default)]
    pub issuer: Option<String>,

    /// Expected token audience (`aud` claim).
    #[serde(default)]
    pub audience: Option<String>,
}

/// JWT signing algorithm.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthAlgorithm {
    /// HMAC with SHA-256.
    #[default]
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = AdminConfig::parse("").unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:8471".parse().unwrap());
        assert_eq!(config.environment, "dev");
        assert!(config.auth.is_none());
        assert_eq!(config.app_config.ttl, Duration::from_secs(60));
        assert!(matches!(config.vault, CipherConfig::Ephemeral));
        assert!(matches!(config.store, StoreConfig::Memory));
    }

    #[test]
    fn config_from_string() {
        let config = AdminConfig::parse(
            r#"
            environment = "prod"

            [server]
            bind_address = "0.0.0.0:9000"

            [vault]
            backend = "keyfile"
            path = "/etc/cart/master.key"

            [app_config]
            ttl = "5m"

            [app_config.seed]
            base_frontend_url = "https://shop.example.com/"
        "#,
        )
        .unwrap();

        assert_eq!(config.environment, "prod");
        assert_eq!(config.server.bind_address, "0.0.0.0:9000".parse().unwrap());
        assert!(matches!(config.vault, CipherConfig::Keyfile { .. }));
        assert_eq!(config.app_config.ttl, Duration::from_secs(300));
        assert_eq!(
            config.app_config.seed.get("base_frontend_url"),
            Some(&serde_json::json!("https://shop.example.com/"))
        );
    }

    #[test]
    fn config_auth() {
        let config = AdminConfig::parse(
            r#"
            [auth]
            secret = "jwt-secret"
            algorithm = "HS384"
            issuer = "cart-auth"
        "#,
        )
        .unwrap();

        let auth = config.auth.expect("auth should be configured");
        assert_eq!(auth.secret, "jwt-secret");
        assert_eq!(auth.algorithm, AuthAlgorithm::HS384);
        assert_eq!(auth.issuer.as_deref(), Some("cart-auth"));
        assert!(auth.audience.is_none());
    }

    #[test]
    fn config_auth_algorithm_defaults_to_hs256() {
        let config = AdminConfig::parse(
            r#"
            [auth]
            secret = "jwt-secret"
        "#,
        )
        .unwrap();

        assert_eq!(config.auth.unwrap().algorithm, AuthAlgorithm::HS256);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = AdminConfig::load_from("/nonexistent/cart-admin.toml").unwrap_err();
        assert!(matches!(err, ConfigFileError::FileNotFound(_)));
    }
}
