//! Failure taxonomy for authentication.
//!
//! Internally the variants stay distinct for logging; at the HTTP boundary
//! they collapse into a handful of generic responses so clients cannot probe
//! which check failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error};

use super::token;
use super::types::MessageResponse;

#[derive(Debug, Error)]
pub enum AuthFailure {
    /// Wrong email or wrong password; never reveals which.
    #[error("incorrect email or password")]
    InvalidCredentials,
    #[error("token rejected: {0}")]
    TokenRejected(#[from] token::Error),
    /// Token was valid but the user it names no longer exists.
    #[error("user no longer exists")]
    UserGone,
    /// Missing, unknown, inactive, or expired API key.
    #[error("invalid or missing API key")]
    ApiKeyInvalid,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidCredentials => (StatusCode::BAD_REQUEST, "Incorrect email or password"),
            Self::TokenRejected(reason) => {
                debug!("Token rejected: {reason}");
                (StatusCode::UNAUTHORIZED, "Could not validate credentials")
            }
            Self::UserGone => {
                debug!("Token subject no longer exists");
                (StatusCode::UNAUTHORIZED, "Could not validate credentials")
            }
            Self::ApiKeyInvalid => (StatusCode::UNAUTHORIZED, "Invalid or missing API key"),
            Self::Store(err) => {
                // Transient store failures are server errors, never auth failures.
                error!("Storage failure during authentication: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (
            status,
            Json(MessageResponse {
                message: message.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn token_failures_collapse_to_unauthorized() {
        for failure in [
            AuthFailure::TokenRejected(token::Error::Expired),
            AuthFailure::TokenRejected(token::Error::SignatureInvalid),
            AuthFailure::TokenRejected(token::Error::Malformed),
            AuthFailure::TokenRejected(token::Error::WrongType),
            AuthFailure::UserGone,
        ] {
            let response = failure.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn credentials_and_api_key_map_distinctly() {
        assert_eq!(
            AuthFailure::InvalidCredentials.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthFailure::ApiKeyInvalid.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthFailure::Store(anyhow!("connection reset"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
