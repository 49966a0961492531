//! Shared application state.

use std::sync::Arc;

use cart_config::ConfigCache;
use cart_tenant::TenantDirectory;

use crate::config::AuthConfig;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Tenant records + vault.
    pub directory: Arc<TenantDirectory>,

    /// TTL-cached application configuration.
    pub app_config: Arc<ConfigCache>,

    /// JWT verification settings; `None` means every caller is anonymous.
    pub auth: Option<Arc<AuthConfig>>,

    /// Deployment environment name (`dev` | `prod`).
    pub environment: String,

    /// Outbound HTTP client for webhook test delivery.
    pub http: reqwest::Client,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.environment)
            .field("auth", &self.auth.is_some())
            .finish_non_exhaustive()
    }
}
