//! Request/response types for auth and credential endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Tokens are delivered in cookies and mirrored in the body for clients that
/// cannot read `HttpOnly` cookies.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ApiKeyCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub expires_in_days: Option<i64>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ApiKeyResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub rate_limit: Option<i32>,
    pub usage_count: i64,
    pub last_used_at: Option<String>,
    pub created_at: String,
    pub expires_at: Option<String>,
}

/// Returned once, at creation: the only time the raw secret is visible.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ApiKeyCreatedResponse {
    #[serde(flatten)]
    pub api_key: ApiKeyResponse,
    pub key: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn token_response_omits_absent_refresh_token() -> Result<()> {
        let response = TokenResponse {
            access_token: "abc".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("refresh_token").is_none());

        let response = TokenResponse {
            access_token: "abc".to_string(),
            refresh_token: Some("def".to_string()),
            token_type: "Bearer".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        let refresh = value
            .get("refresh_token")
            .and_then(serde_json::Value::as_str)
            .context("missing refresh_token")?;
        assert_eq!(refresh, "def");
        Ok(())
    }

    #[test]
    fn created_api_key_flattens_metadata_next_to_secret() -> Result<()> {
        let response = ApiKeyCreatedResponse {
            api_key: ApiKeyResponse {
                id: "id-1".to_string(),
                name: "ci".to_string(),
                description: None,
                is_active: true,
                rate_limit: None,
                usage_count: 0,
                last_used_at: None,
                created_at: "2026-01-01T00:00:00Z".to_string(),
                expires_at: None,
            },
            key: "raw-secret".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.get("key").and_then(serde_json::Value::as_str),
            Some("raw-secret")
        );
        assert_eq!(
            value.get("name").and_then(serde_json::Value::as_str),
            Some("ci")
        );
        Ok(())
    }

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.email, "alice@example.com");
        Ok(())
    }
}
