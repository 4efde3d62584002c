use super::handlers::{
    api_keys,
    auth::{session, types},
    health, users,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        session::login,
        session::refresh,
        session::logout,
        session::session,
        users::register,
        users::me,
        users::change_password,
        users::list_users,
        users::get_user,
        users::delete_user,
        api_keys::create_api_key,
        api_keys::list_api_keys,
        api_keys::revoke_api_key,
        api_keys::delete_api_key
    ),
    components(schemas(
        health::Health,
        types::RegisterRequest,
        types::LoginRequest,
        types::TokenResponse,
        types::SessionResponse,
        types::ChangePasswordRequest,
        types::UserResponse,
        types::ApiKeyCreateRequest,
        types::ApiKeyResponse,
        types::ApiKeyCreatedResponse,
        types::MessageResponse
    )),
    tags(
        (name = "auth", description = "Login, refresh, logout, and session inspection"),
        (name = "users", description = "Registration and user administration"),
        (name = "me", description = "Authenticated self-service"),
        (name = "api-keys", description = "Programmatic credential lifecycle"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

/// `OpenAPI` document generated from the handler annotations; info fields come
/// from Cargo.toml metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
