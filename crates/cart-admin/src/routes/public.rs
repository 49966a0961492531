//! `/public/tenant-config`: the unauthenticated whitelist subset.

use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use cart_tenant::CredentialField;

use crate::error::AdminError;
use crate::routes::ClientIdQuery;
use crate::state::AppState;

/// GET `/public/tenant-config?clientID=...`
///
/// Safe subset for landing pages: the publishable key for the active mode
/// and branding attributes. Only whitelisted fields are ever emitted; no
/// secret-classified field appears here in any form, masked or otherwise.
pub async fn get_public_config(
    State(state): State<AppState>,
    Query(query): Query<ClientIdQuery>,
) -> Result<Json<Value>, AdminError> {
    let client_id = query.client_id.ok_or(AdminError::MissingClientId)?;

    let Some(record) = state.directory.get(&client_id).await? else {
        return Ok(Json(json!({
            "clientID": client_id,
            "exists": false,
            "config": {},
        })));
    };

    let publishable_key = record.field(CredentialField::publishable_for(record.mode));

    let config = json!({
        "clientID": record.client_id,
        "mode": record.mode,
        "active": record.active,
        "publishable_key": publishable_key,
        "brand": record.extra.get("brand").cloned().unwrap_or_else(|| json!({})),
        "support": record.extra.get("support").cloned().unwrap_or_else(|| json!({})),
    });

    Ok(Json(json!({
        "environment": state.environment,
        "exists": true,
        "config": config,
    })))
}
