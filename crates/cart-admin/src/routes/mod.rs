//! HTTP route handlers.

pub mod keys;
pub mod public;
pub mod tenant_config;

use axum::http::HeaderMap;
use serde::Deserialize;

use crate::auth::Caller;

/// Query-string client id, accepting the historical spellings.
#[derive(Debug, Default, Deserialize)]
pub struct ClientIdQuery {
    #[serde(
        default,
        rename = "clientID",
        alias = "clientId",
        alias = "client_id"
    )]
    pub client_id: Option<String>,
}

/// Resolves the target client id from, in order: the `X-Client-Id` header,
/// the query string, and the authenticated caller's own id.
pub(crate) fn resolve_client_id(
    headers: &HeaderMap,
    query: &ClientIdQuery,
    caller: &Caller,
) -> Option<String> {
    headers
        .get("x-client-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| query.client_id.clone())
        .or_else(|| caller.client_id().map(str::to_owned))
}
