//! API key lifecycle endpoints.
//!
//! Keys are opaque 32-byte secrets shown exactly once at creation; only the
//! SHA-256 digest is stored. Every endpoint here requires an authenticated
//! principal, and revoke/delete enforce ownership.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::auth::principal::{require_auth, Principal};
use super::auth::storage::{self, ApiKeyRecord};
use super::auth::types::{
    ApiKeyCreateRequest, ApiKeyCreatedResponse, ApiKeyResponse, MessageResponse,
};
use super::auth::utils::{generate_secret_token, hash_api_key};
use super::auth::AuthState;

fn api_key_response(record: &ApiKeyRecord) -> ApiKeyResponse {
    ApiKeyResponse {
        id: record.id.to_string(),
        name: record.name.clone(),
        description: record.description.clone(),
        is_active: record.is_active,
        rate_limit: record.rate_limit,
        usage_count: record.usage_count,
        last_used_at: record.last_used_at.map(|at| at.to_rfc3339()),
        created_at: record.created_at.to_rfc3339(),
        expires_at: record.expires_at.map(|at| at.to_rfc3339()),
    }
}

fn message(status: StatusCode, text: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            message: text.to_string(),
        }),
    )
        .into_response()
}

/// Load a key and check it belongs to the caller. Absent keys are 404; keys
/// owned by someone else are 403.
async fn owned_key(
    pool: &PgPool,
    principal: &Principal,
    id: &str,
) -> Result<ApiKeyRecord, Response> {
    let Ok(key_id) = Uuid::parse_str(id.trim()) else {
        return Err(message(StatusCode::BAD_REQUEST, "Invalid API key id"));
    };

    match storage::get_api_key(pool, key_id).await {
        Ok(Some(record)) if record.user_id == principal.user_id => Ok(record),
        Ok(Some(_)) => Err(message(
            StatusCode::FORBIDDEN,
            "API key belongs to another user",
        )),
        Ok(None) => Err(message(StatusCode::NOT_FOUND, "API key not found")),
        Err(err) => {
            error!("Failed to fetch API key: {err}");
            Err(message(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/api-keys",
    request_body = ApiKeyCreateRequest,
    responses(
        (status = 201, description = "API key created; the raw secret is returned only here", body = ApiKeyCreatedResponse),
        (status = 400, description = "Invalid name or expiry", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    ),
    tag = "api-keys"
)]
pub async fn create_api_key(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(body): Json<ApiKeyCreateRequest>,
) -> Response {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    let name = body.name.trim();
    if name.is_empty() {
        return message(StatusCode::BAD_REQUEST, "Name must not be empty");
    }

    // `Some(0)` is honored as-is and yields a key that is already expired.
    let expires_at = match body.expires_in_days {
        Some(days) => match Duration::try_days(days) {
            Some(ttl) => Some(Utc::now() + ttl),
            None => return message(StatusCode::BAD_REQUEST, "Invalid expiry"),
        },
        None => None,
    };

    let raw_key = match generate_secret_token() {
        Ok(raw_key) => raw_key,
        Err(err) => {
            error!("Failed to generate API key: {err}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    let digest = hash_api_key(&raw_key);

    let record = storage::insert_api_key(
        &pool,
        principal.user_id,
        &digest,
        name,
        body.description.as_deref(),
        expires_at,
    )
    .await;

    match record {
        Ok(record) => {
            info!(user_id = %principal.user_id, key_id = %record.id, "API key created");
            let response = ApiKeyCreatedResponse {
                api_key: api_key_response(&record),
                key: raw_key,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(err) => {
            error!("Failed to insert API key: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/api-keys",
    responses(
        (status = 200, description = "Caller's API keys, newest first", body = [ApiKeyResponse]),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    ),
    tag = "api-keys"
)]
pub async fn list_api_keys(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    match storage::list_api_keys(&pool, principal.user_id).await {
        Ok(records) => {
            let keys: Vec<ApiKeyResponse> = records.iter().map(api_key_response).collect();
            (StatusCode::OK, Json(keys)).into_response()
        }
        Err(err) => {
            error!("Failed to list API keys: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/api-keys/{id}/revoke",
    params(
        ("id" = String, Path, description = "API key id")
    ),
    responses(
        (status = 200, description = "API key revoked", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse),
        (status = 403, description = "API key belongs to another user", body = MessageResponse),
        (status = 404, description = "API key not found", body = MessageResponse)
    ),
    tag = "api-keys"
)]
pub async fn revoke_api_key(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    let record = match owned_key(&pool, &principal, &id).await {
        Ok(record) => record,
        Err(response) => return response,
    };

    // Revoking an already-revoked key is a no-op, not an error.
    match storage::revoke_api_key(&pool, record.id).await {
        Ok(_) => {
            info!(user_id = %principal.user_id, key_id = %record.id, "API key revoked");
            message(StatusCode::OK, "API key revoked successfully")
        }
        Err(err) => {
            error!("Failed to revoke API key: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[utoipa::path(
    delete,
    path = "/v1/api-keys/{id}",
    params(
        ("id" = String, Path, description = "API key id")
    ),
    responses(
        (status = 200, description = "API key deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse),
        (status = 403, description = "API key belongs to another user", body = MessageResponse),
        (status = 404, description = "API key not found", body = MessageResponse)
    ),
    tag = "api-keys"
)]
pub async fn delete_api_key(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    let record = match owned_key(&pool, &principal, &id).await {
        Ok(record) => record,
        Err(response) => return response,
    };

    match storage::delete_api_key(&pool, record.id).await {
        Ok(true) => {
            info!(user_id = %principal.user_id, key_id = %record.id, "API key deleted");
            message(StatusCode::OK, "API key deleted successfully")
        }
        Ok(false) => message(StatusCode::NOT_FOUND, "API key not found"),
        Err(err) => {
            error!("Failed to delete API key: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
