//! Small helpers shared by the auth handlers: random secrets, digests,
//! email checks, and cookie parsing.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Create a random URL-safe secret with 256 bits of entropy.
///
/// Used for raw API keys and CSRF tokens. The raw value is only handed to the
/// client; the database sees a digest at most.
pub(crate) fn generate_secret_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate secret token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Digest a raw API key so raw secrets never touch the database.
/// The digest is used for lookups when the key is presented.
pub(crate) fn hash_api_key(raw: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher.finalize().to_vec()
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Extract a named cookie from the request headers.
pub(crate) fn extract_cookie(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        // Bare segments without `=` are skipped, not treated as the end of
        // the header; other script on the domain may set such cookies.
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        if key.trim() == name {
            return Some(val.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};
    use base64ct::{Base64UrlUnpadded, Encoding};
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn generate_secret_token_has_full_entropy() {
        let decoded_len = generate_secret_token()
            .ok()
            .and_then(|token| Base64UrlUnpadded::decode_vec(&token).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn generate_secret_token_never_repeats() {
        let first = generate_secret_token().unwrap();
        let second = generate_secret_token().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn hash_api_key_stable_and_distinct() {
        let first = hash_api_key("key");
        let second = hash_api_key("key");
        let different = hash_api_key("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn stored_digest_never_validates_as_a_key() {
        // Lookup is by digest equality, so presenting the persisted digest
        // itself must hash to something else and never match.
        let digest = hash_api_key("raw-secret");
        let digest_as_key = Base64UrlUnpadded::encode_string(&digest);
        assert_ne!(hash_api_key(&digest_as_key), digest);
    }

    #[test]
    fn extract_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("csrf_token=abc; access_token=xyz"),
        );
        assert_eq!(
            extract_cookie(&headers, "access_token"),
            Some("xyz".to_string())
        );
        assert_eq!(
            extract_cookie(&headers, "csrf_token"),
            Some("abc".to_string())
        );
        assert_eq!(extract_cookie(&headers, "refresh_token"), None);
    }

    #[test]
    fn extract_cookie_skips_bare_segments() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("bare_flag; access_token=xyz; another"),
        );
        assert_eq!(
            extract_cookie(&headers, "access_token"),
            Some("xyz".to_string())
        );
        assert_eq!(extract_cookie(&headers, "bare_flag"), None);
    }

    #[test]
    fn extract_cookie_none_without_header() {
        let headers = HeaderMap::new();
        assert_eq!(extract_cookie(&headers, "access_token"), None);
    }

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
