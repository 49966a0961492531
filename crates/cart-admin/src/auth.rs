//! Caller identity from JWT bearer tokens.
//!
//! The `sub` claim of a valid token is the caller's client id. An absent,
//! malformed, or invalid token makes the caller anonymous rather than
//! rejecting the request outright: most routes serve masked views to
//! non-owners, and the ones that require ownership reject with 403 at the
//! handler.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};

use cart_vault::Ownership;

use crate::config::{AuthAlgorithm, AuthConfig};
use crate::state::AppState;

/// Claims extracted from a valid JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub exp: Option<u64>,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
}

/// The resolved caller identity for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// Authenticated; the value is the client id from the `sub` claim.
    Authenticated(String),
    /// No valid token presented.
    Anonymous,
}

impl Caller {
    /// The authenticated client id, if any.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        match self {
            Self::Authenticated(client_id) => Some(client_id),
            Self::Anonymous => None,
        }
    }

    /// Whether the caller owns the record identified by `client_id`.
    #[must_use]
    pub fn is_owner(&self, client_id: &str) -> bool {
        self.client_id() == Some(client_id)
    }

    /// Ownership relation to the record identified by `client_id`.
    #[must_use]
    pub fn ownership_of(&self, client_id: &str) -> Ownership {
        if self.is_owner(client_id) {
            Ownership::Owner
        } else {
            Ownership::NonOwner
        }
    }
}

/// Resolves the caller from the `Authorization` header. With no auth
/// configured every caller is anonymous.
#[must_use]
pub fn authenticate(headers: &HeaderMap, config: Option<&AuthConfig>) -> Caller {
    let Some(config) = config else {
        return Caller::Anonymous;
    };

    let token = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        tracing::debug!("missing or malformed Authorization header");
        return Caller::Anonymous;
    };

    match validate_token(token, config) {
        Ok(token_data) => {
            tracing::debug!(subject = %token_data.claims.sub, "JWT validated");
            Caller::Authenticated(token_data.claims.sub)
        }
        Err(e) => {
            tracing::debug!(error = %e, "JWT validation failed");
            Caller::Anonymous
        }
    }
}

fn validate_token(
    token: &str,
    config: &AuthConfig,
) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    let algorithm = match config.algorithm {
        AuthAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
        AuthAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
        AuthAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
    };

    let mut validation = Validation::new(algorithm);

    if let Some(ref issuer) = config.issuer {
        validation.set_issuer(&[issuer]);
    }

    if let Some(ref audience) = config.audience {
        validation.set_audience(&[audience]);
    } else {
        validation.validate_aud = false;
    }

    let key = DecodingKey::from_secret(config.secret.as_bytes());
    decode::<Claims>(token, &key, &validation)
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(authenticate(&parts.headers, state.auth.as_deref()))
    }
}
