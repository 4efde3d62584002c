//! Authentication handlers and supporting modules.
//!
//! Two credential surfaces share one identity model:
//!
//! - **Sessions**: short-lived access and refresh tokens delivered in
//!   `HttpOnly` cookies, with a double-submit CSRF cookie alongside.
//! - **API keys**: long-lived opaque secrets for programmatic clients,
//!   stored only as SHA-256 digests and metered on every use.

pub(crate) mod csrf;
pub(crate) mod error;
pub(crate) mod password;
pub(crate) mod principal;
pub(crate) mod session;
mod state;
pub(crate) mod storage;
pub(crate) mod token;
pub(crate) mod types;
pub(crate) mod utils;

pub use state::{AuthConfig, AuthState, SameSite};
pub use token::TokenCodec;
