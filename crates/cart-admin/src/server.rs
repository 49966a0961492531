//! Server assembly and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use cart_config::{ConfigCache, ConfigEntry, ConfigScope, MemoryConfigStore};
use cart_tenant::{build_store, TenantDirectory};
use cart_vault::{build_cipher, SecretVault};

use crate::config::AdminConfig;
use crate::error::AdminError;
use crate::routes::{keys, public, tenant_config, webhook_test};
use crate::state::AppState;

/// Builds the router over prepared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/admin/stripe-keys",
            get(keys::get_keys).put(keys::put_keys),
        )
        .route(
            "/admin/tenant-config",
            get(tenant_config::get_tenant_config).put(tenant_config::put_tenant_config),
        )
        .route("/admin/webhook-test", post(webhook_test::post_webhook_test))
        .route("/public/tenant-config", get(public::get_public_config))
        .layer(cors_layer())
        .with_state(state)
}

/// Builds application state from deployment configuration. Required
/// parameters are strict: a broken vault or store backend fails startup.
pub async fn build_state(config: &AdminConfig) -> Result<AppState, AdminError> {
    let cipher = build_cipher(&config.vault).map_err(|e| AdminError::Startup(e.to_string()))?;
    let vault = Arc::new(SecretVault::new(cipher));

    let store = build_store(&config.store)
        .await
        .map_err(|e| AdminError::Startup(e.to_string()))?;
    let directory = Arc::new(TenantDirectory::new(store, vault));

    let config_store = Arc::new(MemoryConfigStore::new());
    if !config.app_config.seed.is_empty() {
        config_store
            .seed(config.app_config.seed.iter().map(|(key, value)| {
                ConfigEntry::new(key.clone(), ConfigScope::Global, value.clone())
            }))
            .await;
        tracing::info!(keys = config.app_config.seed.len(), "config store seeded");
    }
    let app_config = Arc::new(ConfigCache::new(
        config_store,
        config.environment.clone(),
        config.app_config.ttl,
    ));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| AdminError::Startup(e.to_string()))?;

    Ok(AppState {
        directory,
        app_config,
        auth: config.auth.clone().map(Arc::new),
        environment: config.environment.clone(),
        http,
    })
}

/// Runs the server until the cancellation token fires.
pub async fn run(config: AdminConfig, cancel: CancellationToken) -> Result<(), AdminError> {
    let state = build_state(&config).await?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address).await?;

    tracing::info!(
        address = %config.server.bind_address,
        environment = %config.environment,
        auth_enabled = config.auth.is_some(),
        "Admin API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    tracing::info!("Admin API shutdown complete");
    Ok(())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("stripe-signature"),
            HeaderName::from_static("x-client-id"),
        ])
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_builds_state() {
        let state = build_state(&AdminConfig::default()).await.unwrap();
        assert_eq!(state.environment, "dev");
        assert!(state.auth.is_none());
    }
}
