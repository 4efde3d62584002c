//! Unified caller identity for protected endpoints.
//!
//! A request authenticates with either an `X-API-Key` header or a session
//! cookie. The API key path wins when both are present, so automated clients
//! are unaffected by stale cookies left behind in a browser profile.

use axum::http::HeaderMap;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::error::AuthFailure;
use super::session;
use super::state::AuthState;
use super::storage;
use super::utils::hash_api_key;

pub const API_KEY_HEADER: &str = "x-api-key";

/// The raw API key from the request headers, if one was actually presented.
/// An empty header value counts as absent everywhere, including the CSRF
/// guard's bypass.
pub(crate) fn presented_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// How the caller proved who they are.
#[derive(Debug, PartialEq, Eq)]
pub enum Credential {
    Session,
    ApiKey { key_id: Uuid },
}

pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub credential: Credential,
}

/// Authenticate a request, trying the API key header before the session
/// cookie. A present-but-invalid API key fails the request outright rather
/// than falling through to the cookie.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<Principal, AuthFailure> {
    if let Some(raw_key) = presented_api_key(headers) {
        let digest = hash_api_key(raw_key);
        let record = storage::validate_api_key(pool, &digest)
            .await?
            .ok_or(AuthFailure::ApiKeyInvalid)?;

        let user = storage::lookup_user_by_id(pool, record.user_id)
            .await?
            .ok_or(AuthFailure::UserGone)?;

        debug!(user_id = %user.id, key_id = %record.id, "Authenticated via API key");
        return Ok(Principal {
            user_id: user.id,
            email: user.email,
            credential: Credential::ApiKey { key_id: record.id },
        });
    }

    let user = session::current_user(headers, pool, auth_state).await?;
    debug!(user_id = %user.id, "Authenticated via session cookie");
    Ok(Principal {
        user_id: user.id,
        email: user.email,
        credential: Credential::Session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn empty_api_key_header_counts_as_absent() {
        let mut headers = HeaderMap::new();
        assert_eq!(presented_api_key(&headers), None);

        headers.insert(API_KEY_HEADER, HeaderValue::from_static(""));
        assert_eq!(presented_api_key(&headers), None);

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("raw-secret"));
        assert_eq!(presented_api_key(&headers), Some("raw-secret"));
    }

    #[test]
    fn credential_distinguishes_key_from_session() {
        let key_id = Uuid::new_v4();
        assert_ne!(Credential::Session, Credential::ApiKey { key_id });
        assert_eq!(Credential::ApiKey { key_id }, Credential::ApiKey { key_id });
    }
}
