//! User registration, self-service, and user administration endpoints.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::auth::password;
use super::auth::principal::require_auth;
use super::auth::storage::{self, RegisterOutcome, UserRecord};
use super::auth::types::{
    ChangePasswordRequest, MessageResponse, RegisterRequest, UserResponse,
};
use super::auth::utils::{normalize_email, valid_email};
use super::auth::AuthState;

fn user_response(user: &UserRecord) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        created_at: user.created_at.to_rfc3339(),
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

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid email address", body = MessageResponse),
        (status = 409, description = "Email already registered", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn register(pool: Extension<PgPool>, Json(body): Json<RegisterRequest>) -> Response {
    let email = normalize_email(&body.email);
    if !valid_email(&email) {
        return message(StatusCode::BAD_REQUEST, "Invalid email address");
    }
    if body.password.is_empty() {
        return message(StatusCode::BAD_REQUEST, "Password must not be empty");
    }

    let password_hash = match password::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let outcome = storage::insert_user(
        &pool,
        &email,
        &password_hash,
        body.first_name.as_deref(),
        body.last_name.as_deref(),
    )
    .await;

    match outcome {
        Ok(RegisterOutcome::Created(user_id)) => {
            info!(user_id = %user_id, "User registered");
            match storage::lookup_user_by_id(&pool, user_id).await {
                Ok(Some(user)) => {
                    (StatusCode::CREATED, Json(user_response(&user))).into_response()
                }
                Ok(None) => message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
                Err(err) => {
                    error!("Failed to load created user: {err}");
                    message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
            }
        }
        Ok(RegisterOutcome::EmailTaken) => {
            message(StatusCode::CONFLICT, "Email already registered")
        }
        Err(err) => {
            error!("Failed to insert user: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Authenticated user profile", body = UserResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    ),
    tag = "me"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    match storage::lookup_user_by_id(&pool, principal.user_id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user_response(&user))).into_response(),
        Ok(None) => message(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Failed to fetch profile: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Incorrect password", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    ),
    tag = "me"
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(body): Json<ChangePasswordRequest>,
) -> Response {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    let user = match storage::lookup_user_by_id(&pool, principal.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return message(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Failed to fetch user: {err}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    if !password::verify_password(&body.old_password, &user.password_hash) {
        return message(StatusCode::BAD_REQUEST, "Incorrect password");
    }
    if body.new_password.is_empty() {
        return message(StatusCode::BAD_REQUEST, "Password must not be empty");
    }

    let password_hash = match password::hash_password(&body.new_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    match storage::update_password(&pool, user.id, &password_hash).await {
        Ok(()) => {
            info!(user_id = %user.id, "Password changed");
            message(StatusCode::OK, "Password updated successfully")
        }
        Err(err) => {
            error!("Failed to update password: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/users",
    responses(
        (status = 200, description = "List users", body = [UserResponse]),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    if let Err(failure) = require_auth(&headers, &pool, &auth_state).await {
        return failure.into_response();
    }

    match storage::list_users(&pool).await {
        Ok(users) => {
            let users: Vec<UserResponse> = users.iter().map(user_response).collect();
            (StatusCode::OK, Json(users)).into_response()
        }
        Err(err) => {
            error!("Failed to list users: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User detail", body = UserResponse),
        (status = 400, description = "Invalid user id", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    if let Err(failure) = require_auth(&headers, &pool, &auth_state).await {
        return failure.into_response();
    }

    let Ok(user_id) = Uuid::parse_str(id.trim()) else {
        return message(StatusCode::BAD_REQUEST, "Invalid user id");
    };

    match storage::lookup_user_by_id(&pool, user_id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user_response(&user))).into_response(),
        Ok(None) => message(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Failed to fetch user: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Invalid user id", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    Path(id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    let Ok(user_id) = Uuid::parse_str(id.trim()) else {
        return message(StatusCode::BAD_REQUEST, "Invalid user id");
    };

    // Owned API keys go with the user via ON DELETE CASCADE.
    match storage::delete_user(&pool, user_id).await {
        Ok(true) => {
            info!(user_id = %user_id, deleted_by = %principal.user_id, "User deleted");
            message(StatusCode::OK, "User deleted successfully")
        }
        Ok(false) => message(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Failed to delete user: {err}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
