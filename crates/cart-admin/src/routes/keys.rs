//! `/admin/stripe-keys`: credential management.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use cart_tenant::{CredentialField, Mode, TenantPatch};

use crate::auth::Caller;
use crate::error::AdminError;
use crate::routes::ClientIdQuery;
use crate::state::AppState;

/// GET `/admin/stripe-keys?clientID=...`
///
/// Returns the per-field credential view: publishable keys as plaintext for
/// any caller, secret fields disclosed per the ownership gate. A missing
/// record is not an error; the response says so, as it always has.
pub async fn get_keys(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ClientIdQuery>,
) -> Result<Response, AdminError> {
    let client_id = query
        .client_id
        .or_else(|| caller.client_id().map(str::to_owned))
        .ok_or(AdminError::MissingClientId)?;

    let view = state
        .directory
        .credential_view(&client_id, caller.ownership_of(&client_id))
        .await?;

    Ok(match view {
        Some(view) => Json(view).into_response(),
        None => Json(json!({
            "clientID": client_id,
            "message": "No keys found",
        }))
        .into_response(),
    })
}

/// PUT `/admin/stripe-keys` request body. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct PutKeysRequest {
    #[serde(
        default,
        rename = "clientID",
        alias = "clientId",
        alias = "client_id"
    )]
    pub client_id: Option<String>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub pk_test: Option<String>,
    #[serde(default)]
    pub pk_live: Option<String>,
    #[serde(default)]
    pub sk_test: Option<String>,
    #[serde(default)]
    pub sk_live: Option<String>,
    #[serde(default)]
    pub wh_secret_test: Option<String>,
    #[serde(default)]
    pub wh_secret_live: Option<String>,
}

/// PUT `/admin/stripe-keys`
///
/// Owner-only partial update. Secret fields are encrypted before the write;
/// the response never echoes a credential back.
pub async fn put_keys(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<PutKeysRequest>,
) -> Result<Json<serde_json::Value>, AdminError> {
    let client_id = body
        .client_id
        .clone()
        .or_else(|| caller.client_id().map(str::to_owned))
        .ok_or(AdminError::MissingClientId)?;

    if !caller.is_owner(&client_id) {
        return Err(AdminError::AccessDenied);
    }

    let mut patch = TenantPatch::new();
    if let Some(mode) = body.mode {
        patch = patch.with_mode(mode);
    }
    if let Some(active) = body.active {
        patch = patch.with_active(active);
    }

    let fields = [
        (CredentialField::PkTest, body.pk_test),
        (CredentialField::PkLive, body.pk_live),
        (CredentialField::SkTest, body.sk_test),
        (CredentialField::SkLive, body.sk_live),
        (CredentialField::WhSecretTest, body.wh_secret_test),
        (CredentialField::WhSecretLive, body.wh_secret_live),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            patch = patch.set(field, value);
        }
    }

    let record = state.directory.upsert_partial(&client_id, patch).await?;

    Ok(Json(json!({
        "clientID": client_id,
        "updated_at": record.updated_at,
        "success": true,
    })))
}
