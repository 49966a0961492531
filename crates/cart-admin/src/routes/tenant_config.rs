//! `/admin/tenant-config`: combined tenant row + tenant-scoped settings.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Map, Value};

use cart_config::{ConfigEntry, ConfigScope};
use cart_tenant::{CredentialField, Mode, TenantPatch, TenantRecord};
use cart_vault::Ownership;

use crate::auth::Caller;
use crate::error::AdminError;
use crate::routes::{resolve_client_id, ClientIdQuery};
use crate::state::AppState;

/// Legacy webhook-secret aliases accepted on write, normalised to their
/// canonical field so they can never land in storage unencrypted.
const WRITE_ALIASES: [(&str, CredentialField); 2] = [
    ("whsec_test", CredentialField::WhSecretTest),
    ("whsec_live", CredentialField::WhSecretLive),
];

/// GET `/admin/tenant-config`
///
/// Returns the tenant row with secret fields masked, plus the
/// tenant-scoped configuration entries. This is a display endpoint:
/// secrets are masked regardless of ownership; the keys endpoint is the
/// one that discloses plaintext to owners.
pub async fn get_tenant_config(
    State(state): State<AppState>,
    caller: Caller,
    headers: HeaderMap,
    Query(query): Query<ClientIdQuery>,
) -> Result<Json<Value>, AdminError> {
    let client_id =
        resolve_client_id(&headers, &query, &caller).ok_or(AdminError::MissingClientId)?;

    let record = state.directory.get(&client_id).await?;
    let tenant_config = tenant_scoped_config(&state, &client_id).await?;

    let Some(record) = record else {
        if tenant_config.is_empty() {
            return Ok(Json(json!({
                "clientID": client_id,
                "exists": false,
                "tenant": {},
                "tenant_config": {},
            })));
        }
        return Ok(Json(json!({
            "clientID": client_id,
            "environment": state.environment,
            "exists": true,
            "tenant": {},
            "tenant_config": tenant_config,
        })));
    };

    let tenant = masked_record(&state, &record).await?;

    Ok(Json(json!({
        "clientID": client_id,
        "environment": state.environment,
        "exists": true,
        "tenant": tenant,
        "tenant_config": tenant_config,
    })))
}

/// PUT `/admin/tenant-config`
///
/// Owner-only upsert that splits the body: credential fields (including the
/// legacy webhook-secret aliases) go to the tenant record through the
/// encrypting write path, webhook endpoint URLs land in the record extras,
/// and everything else becomes a `<client_id>:<key>` configuration entry.
pub async fn put_tenant_config(
    State(state): State<AppState>,
    caller: Caller,
    headers: HeaderMap,
    Query(query): Query<ClientIdQuery>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Value>, AdminError> {
    let client_id = body
        .get("clientID")
        .or_else(|| body.get("clientId"))
        .or_else(|| body.get("client_id"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| resolve_client_id(&headers, &query, &caller));
    let client_id = client_id.ok_or(AdminError::MissingClientId)?;

    if !caller.is_owner(&client_id) {
        return Err(AdminError::AccessDenied);
    }
    if body.is_empty() {
        return Err(AdminError::BadRequest("Empty payload".to_owned()));
    }

    let mut patch = TenantPatch::new();
    let mut config_updates: Vec<(String, Value)> = Vec::new();
    let mut updated: Vec<String> = Vec::new();

    for (key, value) in &body {
        if matches!(key.as_str(), "clientID" | "clientId" | "client_id") {
            continue;
        }

        if key == "mode" {
            let mode: Mode = serde_json::from_value(value.clone())
                .map_err(|_| AdminError::BadRequest("mode must be 'test' or 'live'".to_owned()))?;
            patch = patch.with_mode(mode);
            updated.push(key.clone());
            continue;
        }

        if key == "active" {
            let active = value
                .as_bool()
                .ok_or_else(|| AdminError::BadRequest("active must be a boolean".to_owned()))?;
            patch = patch.with_active(active);
            updated.push(key.clone());
            continue;
        }

        let credential_field = CredentialField::from_name(key).or_else(|| {
            WRITE_ALIASES
                .iter()
                .find(|(alias, _)| *alias == key.as_str())
                .map(|(_, field)| *field)
        });
        if let Some(field) = credential_field {
            let text = value.as_str().ok_or_else(|| {
                AdminError::BadRequest(format!("{key} must be a string"))
            })?;
            patch = patch.set(field, text);
            updated.push(field.name().to_owned());
            continue;
        }

        if key.starts_with("webhook_url_") {
            patch = patch.with_extra(key.clone(), value.clone());
            updated.push(key.clone());
            continue;
        }

        if key == "tenant_config" {
            let nested = value.as_object().ok_or_else(|| {
                AdminError::BadRequest("tenant_config must be an object".to_owned())
            })?;
            for (nested_key, nested_value) in nested {
                config_updates.push((nested_key.clone(), nested_value.clone()));
            }
            continue;
        }

        config_updates.push((key.clone(), value.clone()));
    }

    if !patch.is_empty() {
        state.directory.upsert_partial(&client_id, patch).await?;
    }

    let scope = ConfigScope::Environment(state.environment.clone());
    for (key, value) in config_updates {
        state
            .app_config
            .store()
            .put(ConfigEntry::new(
                format!("{client_id}:{key}"),
                scope.clone(),
                value,
            ))
            .await?;
        updated.push(key);
    }

    Ok(Json(json!({
        "success": true,
        "updated": updated,
        "environment": state.environment,
    })))
}

/// Tenant-scoped configuration entries, keys stripped of the
/// `<client_id>:` prefix.
async fn tenant_scoped_config(
    state: &AppState,
    client_id: &str,
) -> Result<Map<String, Value>, AdminError> {
    let scope = ConfigScope::Environment(state.environment.clone());
    let prefix = format!("{client_id}:");

    let entries = state.app_config.store().prefixed(&scope, &prefix).await?;

    let mut config = Map::new();
    for entry in entries {
        let key = entry.key[prefix.len()..].to_owned();
        config.insert(key, entry.value);
    }
    Ok(config)
}

/// The tenant row as JSON with every secret-classified field replaced by
/// its masked disclosure.
async fn masked_record(state: &AppState, record: &TenantRecord) -> Result<Value, AdminError> {
    let mut json = serde_json::to_value(record)
        .map_err(|e| AdminError::Internal(format!("record serialisation: {e}")))?;

    let Some(object) = json.as_object_mut() else {
        return Err(AdminError::Internal("record is not an object".to_owned()));
    };

    for field in CredentialField::ALL {
        if !field.is_secret() {
            continue;
        }
        if let Some(stored) = record.field(field) {
            let disclosure = state
                .directory
                .vault()
                .disclose(stored, Ownership::NonOwner)
                .await;
            let masked = serde_json::to_value(disclosure)
                .map_err(|e| AdminError::Internal(format!("disclosure serialisation: {e}")))?;
            object.insert(field.name().to_owned(), masked);
        }
    }

    // Legacy secret aliases live in the schemaless extras; mask them the
    // same way so not even their ciphertext leaves the record.
    for (alias, _) in WRITE_ALIASES {
        if let Some(stored) = record.extra_str(alias) {
            let disclosure = state
                .directory
                .vault()
                .disclose(stored, Ownership::NonOwner)
                .await;
            let masked = serde_json::to_value(disclosure)
                .map_err(|e| AdminError::Internal(format!("disclosure serialisation: {e}")))?;
            object.insert(alias.to_owned(), masked);
        }
    }

    Ok(json)
}
