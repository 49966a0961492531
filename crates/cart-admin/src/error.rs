//! Admin API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use cart_config::ConfigError;
use cart_tenant::TenantError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("clientID required")]
    MissingClientId,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("can only access your own keys")]
    AccessDenied,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("webhook delivery failed: {0}")]
    Delivery(String),

    #[error(transparent)]
    Tenant(#[from] TenantError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("startup error: {0}")]
    Startup(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdminError {
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MissingClientId => "missing_client_id",
            Self::BadRequest(_) => "bad_request",
            Self::AccessDenied => "access_denied",
            Self::NotFound(_) => "not_found",
            Self::Delivery(_) => "delivery_failed",
            Self::Tenant(TenantError::NotFound(_)) => "tenant_not_found",
            Self::Tenant(TenantError::FieldNotSet(_)) => "credential_not_configured",
            Self::Tenant(_) => "tenant_error",
            Self::Config(ConfigError::MissingKey { .. }) => "missing_config_key",
            Self::Config(_) => "config_error",
            Self::Startup(_) => "startup_error",
            Self::Internal(_) => "internal_error",
            Self::Io(_) => "io_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingClientId | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::Tenant(TenantError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Tenant(TenantError::FieldNotSet(_)) => StatusCode::BAD_REQUEST,
            Self::Delivery(_) => StatusCode::BAD_GATEWAY,
            Self::Tenant(_)
            | Self::Config(_)
            | Self::Startup(_)
            | Self::Internal(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Sanitise messages for external responses: expected-condition
        // errors carry their message, infrastructure failures do not.
        let message = match &self {
            Self::MissingClientId
            | Self::BadRequest(_)
            | Self::AccessDenied
            | Self::NotFound(_)
            | Self::Tenant(TenantError::NotFound(_))
            | Self::Tenant(TenantError::FieldNotSet(_)) => self.to_string(),
            Self::Delivery(_) => "Webhook delivery failed".to_owned(),
            Self::Tenant(_)
            | Self::Config(_)
            | Self::Startup(_)
            | Self::Internal(_)
            | Self::Io(_) => {
                tracing::error!(error = %self, error_type = self.error_type(), "request failed");
                "Internal server error".to_owned()
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_tenant::StoreError;

    #[test]
    fn status_codes() {
        assert_eq!(
            AdminError::MissingClientId.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AdminError::AccessDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AdminError::Tenant(TenantError::NotFound("acme".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AdminError::Tenant(TenantError::Store(StoreError::Connection("down".into())))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AdminError::Delivery("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn error_types() {
        assert_eq!(
            AdminError::Tenant(TenantError::NotFound("x".into())).error_type(),
            "tenant_not_found"
        );
        assert_eq!(AdminError::AccessDenied.error_type(), "access_denied");
    }
}
