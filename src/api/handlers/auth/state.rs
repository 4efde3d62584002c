//! Auth configuration and per-process auth state.

use anyhow::{Context, Result};

use super::password;
use super::token::TokenCodec;
use super::utils::generate_secret_token;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_CSRF_TTL_SECONDS: i64 = 24 * 60 * 60;

/// `SameSite` policy applied to every cookie the service sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lax => "Lax",
            Self::Strict => "Strict",
            Self::None => "None",
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    csrf_ttl_seconds: i64,
    same_site: SameSite,
    rotate_refresh: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            csrf_ttl_seconds: DEFAULT_CSRF_TTL_SECONDS,
            same_site: SameSite::Lax,
            rotate_refresh: false,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_csrf_ttl_seconds(mut self, seconds: i64) -> Self {
        self.csrf_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_rotate_refresh(mut self, rotate: bool) -> Self {
        self.rotate_refresh = rotate;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    pub(crate) fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    pub(crate) fn csrf_ttl_seconds(&self) -> i64 {
        self.csrf_ttl_seconds
    }

    pub(crate) fn same_site(&self) -> SameSite {
        self.same_site
    }

    /// Whether refresh mints a new refresh token too (sliding session).
    pub(crate) fn rotate_refresh(&self) -> bool {
        self.rotate_refresh
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(crate) fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Read-only auth state shared across requests: configuration, the token
/// codec, and a fallback digest burned on unknown emails so login failures
/// cost the same whether or not the account exists.
pub struct AuthState {
    config: AuthConfig,
    codec: TokenCodec,
    fallback_hash: String,
}

impl AuthState {
    /// Build the shared auth state.
    ///
    /// # Errors
    ///
    /// Fails only when the fallback digest cannot be generated, which is a
    /// startup-fatal condition.
    pub fn new(config: AuthConfig, codec: TokenCodec) -> Result<Self> {
        let throwaway = generate_secret_token().context("failed to seed fallback digest")?;
        let fallback_hash =
            password::hash_password(&throwaway).context("failed to hash fallback digest")?;
        Ok(Self {
            config,
            codec,
            fallback_hash,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub(crate) fn fallback_hash(&self) -> &str {
        &self.fallback_hash
    }
}

#[cfg(test)]
mod tests {
    use super::super::token::TokenCodec;
    use super::{AuthConfig, AuthState, SameSite};
    use secrecy::SecretString;

    fn codec() -> TokenCodec {
        TokenCodec::new(SecretString::from(
            "0123456789abcdef0123456789abcdef".to_string(),
        ))
        .unwrap()
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://bots.example.com".to_string());

        assert_eq!(config.frontend_base_url(), "https://bots.example.com");
        assert_eq!(
            config.access_ttl_seconds(),
            super::DEFAULT_ACCESS_TTL_SECONDS
        );
        assert_eq!(
            config.refresh_ttl_seconds(),
            super::DEFAULT_REFRESH_TTL_SECONDS
        );
        assert_eq!(config.csrf_ttl_seconds(), super::DEFAULT_CSRF_TTL_SECONDS);
        assert_eq!(config.same_site(), SameSite::Lax);
        assert!(!config.rotate_refresh());
        assert!(config.cookie_secure());

        let config = config
            .with_access_ttl_seconds(120)
            .with_refresh_ttl_seconds(600)
            .with_csrf_ttl_seconds(60)
            .with_same_site(SameSite::None)
            .with_rotate_refresh(true);

        assert_eq!(config.access_ttl_seconds(), 120);
        assert_eq!(config.refresh_ttl_seconds(), 600);
        assert_eq!(config.csrf_ttl_seconds(), 60);
        assert_eq!(config.same_site(), SameSite::None);
        assert!(config.rotate_refresh());
    }

    #[test]
    fn plain_http_frontend_disables_secure_cookies() {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        assert!(!config.cookie_secure());
    }

    #[test]
    fn auth_state_burns_a_real_fallback_digest() {
        let config = AuthConfig::new("http://localhost:3000".to_string());
        let state = AuthState::new(config, codec()).unwrap();
        // The fallback digest must be a parseable argon2 digest that matches
        // no guessable password.
        assert!(state.fallback_hash().starts_with("$argon2"));
        assert!(!super::password::verify_password("", state.fallback_hash()));
    }
}
