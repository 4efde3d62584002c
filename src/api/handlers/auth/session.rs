//! Cookie session endpoints: login, refresh, logout, current session.

use axum::{
    extract::Extension,
    http::{
        header::{HeaderValue, InvalidHeaderValue, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::error::AuthFailure;
use super::csrf::CSRF_COOKIE_NAME;
use super::password;
use super::state::{AuthConfig, AuthState};
use super::storage::{self, UserRecord};
use super::token::{self, TokenKind};
use super::types::{LoginRequest, MessageResponse, SessionResponse, TokenResponse};
use super::utils::{extract_cookie, generate_secret_token, normalize_email};

pub(crate) const ACCESS_COOKIE_NAME: &str = "access_token";
pub(crate) const REFRESH_COOKIE_NAME: &str = "refresh_token";
/// The refresh cookie is only ever sent to the refresh endpoint.
pub(crate) const REFRESH_COOKIE_PATH: &str = "/v1/auth/refresh";

#[utoipa::path(
    post,
    path = "/v1/auth/token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; cookies set", body = TokenResponse),
        (status = 400, description = "Incorrect email or password", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(body): Json<LoginRequest>,
) -> Response {
    let email = normalize_email(&body.email);

    let user = match storage::lookup_user_by_email(&pool, &email).await {
        Ok(user) => user,
        Err(err) => return AuthFailure::Store(err).into_response(),
    };

    let Some(user) = user else {
        // Burn a verification on unknown emails so the failure costs the same
        // as a wrong password.
        let _ = password::verify_password(&body.password, auth_state.fallback_hash());
        return AuthFailure::InvalidCredentials.into_response();
    };

    if !password::verify_password(&body.password, &user.password_hash) {
        return AuthFailure::InvalidCredentials.into_response();
    }

    let config = auth_state.config();
    let subject = user.id.to_string();
    let access = auth_state
        .codec()
        .issue(&subject, TokenKind::Access, config.access_ttl_seconds());
    let refresh = auth_state
        .codec()
        .issue(&subject, TokenKind::Refresh, config.refresh_ttl_seconds());

    let csrf = match generate_secret_token() {
        Ok(csrf) => csrf,
        Err(err) => return AuthFailure::Store(err).into_response(),
    };

    let headers = match login_cookies(config, &access, &refresh, &csrf) {
        Ok(headers) => headers,
        Err(err) => {
            error!("Failed to build session cookies: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    info!(user_id = %user.id, "User logged in");

    let body = TokenResponse {
        access_token: access,
        refresh_token: Some(refresh),
        token_type: "Bearer".to_string(),
    };
    (StatusCode::OK, headers, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    responses(
        (status = 200, description = "New access token issued", body = TokenResponse),
        (status = 401, description = "Missing, invalid, or expired refresh token", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    let Some(refresh_token) = extract_cookie(&headers, REFRESH_COOKIE_NAME) else {
        return AuthFailure::TokenRejected(token::Error::Malformed).into_response();
    };

    let claims = match auth_state
        .codec()
        .decode_expecting(&refresh_token, TokenKind::Refresh)
    {
        Ok(claims) => claims,
        Err(err) => return AuthFailure::TokenRejected(err).into_response(),
    };

    // Subjects are user ids; a garbled subject means a garbled token.
    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return AuthFailure::TokenRejected(token::Error::Malformed).into_response();
    };

    let user = match storage::lookup_user_by_id(&pool, user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return AuthFailure::UserGone.into_response(),
        Err(err) => return AuthFailure::Store(err).into_response(),
    };

    let config = auth_state.config();
    let subject = user.id.to_string();
    let access = auth_state
        .codec()
        .issue(&subject, TokenKind::Access, config.access_ttl_seconds());

    let mut response_headers = HeaderMap::new();
    let access_cookie = build_cookie(
        config,
        ACCESS_COOKIE_NAME,
        &access,
        "/",
        config.access_ttl_seconds(),
        true,
    );
    // A new refresh token only when configured to slide the session.
    let rotated = if config.rotate_refresh() {
        Some(
            auth_state
                .codec()
                .issue(&subject, TokenKind::Refresh, config.refresh_ttl_seconds()),
        )
    } else {
        None
    };

    let cookies = access_cookie.and_then(|cookie| {
        response_headers.append(SET_COOKIE, cookie);
        if let Some(rotated) = &rotated {
            let cookie = build_cookie(
                config,
                REFRESH_COOKIE_NAME,
                rotated,
                REFRESH_COOKIE_PATH,
                config.refresh_ttl_seconds(),
                true,
            )?;
            response_headers.append(SET_COOKIE, cookie);
        }
        Ok(())
    });
    if let Err(err) = cookies {
        error!("Failed to build session cookies: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    debug!(user_id = %user.id, rotated = rotated.is_some(), "Access token refreshed");

    let body = TokenResponse {
        access_token: access,
        refresh_token: rotated,
        token_type: "Bearer".to_string(),
    };
    (StatusCode::OK, response_headers, Json(body)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Cookies cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> Response {
    // Tokens stay valid until natural expiry; logout only clears the client's
    // copies of them.
    let mut headers = HeaderMap::new();
    let config = auth_state.config();
    let cleared = clear_cookie(config, ACCESS_COOKIE_NAME, "/", true)
        .and_then(|cookie| {
            headers.append(SET_COOKIE, cookie);
            clear_cookie(config, REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH, true)
        })
        .and_then(|cookie| {
            headers.append(SET_COOKIE, cookie);
            clear_cookie(config, CSRF_COOKIE_NAME, "/", false)
        })
        .map(|cookie| {
            headers.append(SET_COOKIE, cookie);
        });
    if let Err(err) = cleared {
        error!("Failed to build clearing cookies: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        headers,
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 401, description = "No valid access token", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    match current_user(&headers, &pool, &auth_state).await {
        Ok(user) => {
            let response = SessionResponse {
                user_id: user.id.to_string(),
                email: user.email,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(failure) => failure.into_response(),
    }
}

/// Resolve the current user from the access cookie.
///
/// There is deliberately no fallback to the refresh token here: a refresh
/// cookie alone means the client should hit the refresh endpoint first.
pub(crate) async fn current_user(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<UserRecord, AuthFailure> {
    let access_token = extract_cookie(headers, ACCESS_COOKIE_NAME);

    let Some(access_token) = access_token else {
        if extract_cookie(headers, REFRESH_COOKIE_NAME).is_some() {
            debug!("No access token but refresh cookie present; client should refresh");
        }
        return Err(AuthFailure::TokenRejected(token::Error::Malformed));
    };

    let claims = auth_state
        .codec()
        .decode_expecting(&access_token, TokenKind::Access)?;

    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|_| AuthFailure::from(token::Error::Malformed))?;

    match storage::lookup_user_by_id(pool, user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(AuthFailure::UserGone),
        Err(err) => Err(AuthFailure::Store(err)),
    }
}

/// Build the three login cookies: `HttpOnly` access and refresh tokens, and a
/// script-readable CSRF token for the double-submit check.
fn login_cookies(
    config: &AuthConfig,
    access: &str,
    refresh: &str,
    csrf: &str,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        build_cookie(
            config,
            ACCESS_COOKIE_NAME,
            access,
            "/",
            config.access_ttl_seconds(),
            true,
        )?,
    );
    headers.append(
        SET_COOKIE,
        build_cookie(
            config,
            REFRESH_COOKIE_NAME,
            refresh,
            REFRESH_COOKIE_PATH,
            config.refresh_ttl_seconds(),
            true,
        )?,
    );
    headers.append(
        SET_COOKIE,
        build_cookie(
            config,
            CSRF_COOKIE_NAME,
            csrf,
            "/",
            config.csrf_ttl_seconds(),
            false,
        )?,
    );
    Ok(headers)
}

fn build_cookie(
    config: &AuthConfig,
    name: &str,
    value: &str,
    path: &str,
    max_age: i64,
    http_only: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let same_site = config.same_site().as_str();
    let mut cookie = format!("{name}={value}; Path={path}; SameSite={same_site}; Max-Age={max_age}");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_cookie(
    config: &AuthConfig,
    name: &str,
    path: &str,
    http_only: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(config, name, "", path, 0, http_only)
}
