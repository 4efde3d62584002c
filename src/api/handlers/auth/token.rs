//! Compact HS256 bearer tokens for sessions.
//!
//! Tokens carry `{sub, type, exp}` and nothing else. The signature is checked
//! before any claim is trusted, and expiry is strict: an `exp` at or before
//! now is rejected with no grace window.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Minimum signing secret length in bytes.
const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Which half of the session pair a token is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    SignatureInvalid,
    #[error("token expired")]
    Expired,
    #[error("wrong token type")]
    WrongType,
    #[error("signing secret must be at least {MIN_SECRET_BYTES} bytes")]
    WeakSecret,
}

/// Signs and verifies session tokens with a process-wide secret.
///
/// The secret is injected at construction and never rotated at runtime;
/// rotating it invalidates every outstanding token.
pub struct TokenCodec {
    secret: SecretString,
}

impl TokenCodec {
    /// Build a codec, rejecting secrets too short to be worth signing with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WeakSecret`] for secrets under 32 bytes. Callers are
    /// expected to treat this as fatal at startup.
    pub fn new(secret: SecretString) -> Result<Self, Error> {
        if secret.expose_secret().len() < MIN_SECRET_BYTES {
            return Err(Error::WeakSecret);
        }
        Ok(Self { secret })
    }

    /// Issue a signed token for `subject` expiring `ttl_seconds` from now.
    pub fn issue(&self, subject: &str, kind: TokenKind, ttl_seconds: i64) -> String {
        self.issue_at(subject, kind, ttl_seconds, Utc::now().timestamp())
    }

    pub(crate) fn issue_at(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl_seconds: i64,
        now_unix: i64,
    ) -> String {
        let claims = Claims {
            sub: subject.to_string(),
            kind,
            exp: now_unix + ttl_seconds,
        };
        // Serialization of these fixed shapes cannot fail.
        let header_b64 = b64e_json(&TokenHeader::hs256());
        let claims_b64 = b64e_json(&claims);
        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature_b64 = Base64UrlUnpadded::encode_string(&self.sign(signing_input.as_bytes()));

        format!("{signing_input}.{signature_b64}")
    }

    /// Verify a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not three base64url segments of valid
    /// JSON, the signature does not match, or `exp` has passed.
    pub fn decode(&self, token: &str) -> Result<Claims, Error> {
        self.decode_at(token, Utc::now().timestamp())
    }

    pub(crate) fn decode_at(&self, token: &str, now_unix: i64) -> Result<Claims, Error> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(Error::Malformed)?;
        let claims_b64 = parts.next().ok_or(Error::Malformed)?;
        let sig_b64 = parts.next().ok_or(Error::Malformed)?;
        if parts.next().is_some() {
            return Err(Error::Malformed);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(Error::Malformed);
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Malformed)?;
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        // Constant-time comparison via the MAC itself.
        mac.verify_slice(&signature)
            .map_err(|_| Error::SignatureInvalid)?;

        let claims: Claims = b64d_json(claims_b64)?;
        if claims.exp <= now_unix {
            return Err(Error::Expired);
        }

        Ok(claims)
    }

    /// Decode and additionally require the token to be of `kind`.
    ///
    /// # Errors
    ///
    /// Any [`decode`](Self::decode) error, plus [`Error::WrongType`] when an
    /// access token is presented where a refresh token is required or vice
    /// versa.
    pub fn decode_expecting(&self, token: &str, kind: TokenKind) -> Result<Claims, Error> {
        let claims = self.decode(token)?;
        if claims.kind != kind {
            return Err(Error::WrongType);
        }
        Ok(claims)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts any key length; length is policed in `new`.
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

fn b64e_json<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_vec(value).unwrap_or_default();
    Base64UrlUnpadded::encode_string(&json)
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| Error::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    const NOW: i64 = 1_700_000_000;

    fn codec() -> TokenCodec {
        TokenCodec::new(SecretString::from(
            "0123456789abcdef0123456789abcdef".to_string(),
        ))
        .unwrap()
    }

    #[test]
    fn rejects_short_secret() {
        let result = TokenCodec::new(SecretString::from("short".to_string()));
        assert!(matches!(result, Err(Error::WeakSecret)));
    }

    #[test]
    fn issue_then_decode_round_trips() -> Result<(), Error> {
        let codec = codec();
        let token = codec.issue_at("user-1", TokenKind::Access, 1800, NOW);
        let claims = codec.decode_at(&token, NOW + 1)?;
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp, NOW + 1800);
        Ok(())
    }

    #[test]
    fn wire_shape_matches_contract() {
        let codec = codec();
        let token = codec.issue_at("user-1", TokenKind::Refresh, 60, NOW);
        let claims_b64 = token.split('.').nth(1).unwrap();
        let bytes = Base64UrlUnpadded::decode_vec(claims_b64).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["sub"], "user-1");
        assert_eq!(value["type"], "refresh");
        assert_eq!(value["exp"], NOW + 60);
    }

    #[test]
    fn expiry_is_strict() {
        let codec = codec();
        let token = codec.issue_at("user-1", TokenKind::Access, 60, NOW);
        // Valid one second before expiry, rejected at the expiry instant.
        assert!(codec.decode_at(&token, NOW + 59).is_ok());
        assert!(matches!(
            codec.decode_at(&token, NOW + 60),
            Err(Error::Expired)
        ));
        assert!(matches!(
            codec.decode_at(&token, NOW + 61),
            Err(Error::Expired)
        ));
    }

    #[test]
    fn type_confusion_is_rejected_both_ways() {
        let codec = codec();
        let access = codec.issue("user-1", TokenKind::Access, 1800);
        let refresh = codec.issue("user-1", TokenKind::Refresh, 1800);

        assert!(matches!(
            codec.decode_expecting(&access, TokenKind::Refresh),
            Err(Error::WrongType)
        ));
        assert!(matches!(
            codec.decode_expecting(&refresh, TokenKind::Access),
            Err(Error::WrongType)
        ));
        assert!(codec.decode_expecting(&access, TokenKind::Access).is_ok());
        assert!(codec.decode_expecting(&refresh, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let codec = codec();
        let token = codec.issue_at("user-1", TokenKind::Access, 1800, NOW);
        let mut parts: Vec<&str> = token.split('.').collect();

        let forged = b64e_json(&Claims {
            sub: "user-2".to_string(),
            kind: TokenKind::Access,
            exp: NOW + 1800,
        });
        parts[1] = &forged;
        let tampered = parts.join(".");
        assert!(matches!(
            codec.decode_at(&tampered, NOW),
            Err(Error::SignatureInvalid)
        ));
    }

    #[test]
    fn wrong_key_fails_signature() {
        let codec = codec();
        let other = TokenCodec::new(SecretString::from(
            "fedcba9876543210fedcba9876543210".to_string(),
        ))
        .unwrap();
        let token = codec.issue_at("user-1", TokenKind::Access, 1800, NOW);
        assert!(matches!(
            other.decode_at(&token, NOW),
            Err(Error::SignatureInvalid)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        for input in ["", "abc", "a.b", "a.b.c.d", "not base64 . at . all"] {
            assert!(matches!(codec.decode_at(input, NOW), Err(Error::Malformed)));
        }
    }
}
