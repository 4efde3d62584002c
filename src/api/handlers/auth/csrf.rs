//! Double-submit-cookie CSRF protection.
//!
//! The token minted at login lives in a script-readable cookie and must be
//! echoed back in `X-CSRF-Token` on every mutating request. Validity is pure
//! equality of the two presented values; nothing is stored server-side.

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use super::principal::presented_api_key;
use super::types::MessageResponse;
use super::utils::extract_cookie;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub(crate) const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Bootstrap endpoints: no CSRF cookie can exist before the first login.
const EXEMPT_PATHS: &[&str] = &["/v1/auth/token", "/v1/auth/refresh", "/v1/users"];

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Rejection {
    Missing,
    Mismatch,
}

fn is_protected(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Compare the header and cookie halves of the double-submit pair.
pub(crate) fn check(header: Option<&str>, cookie: Option<&str>) -> Result<(), Rejection> {
    match (header, cookie) {
        (Some(header), Some(cookie)) if !header.is_empty() && !cookie.is_empty() => {
            if header == cookie {
                Ok(())
            } else {
                Err(Rejection::Mismatch)
            }
        }
        _ => Err(Rejection::Missing),
    }
}

/// Router-wide middleware enforcing the double-submit check on mutating verbs.
pub async fn guard(request: Request, next: Next) -> Response {
    if !is_protected(request.method()) {
        return next.run(request).await;
    }

    if EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    // API-key callers carry no cookies, so there is no CSRF surface to guard.
    // Same non-empty rule as identity resolution: an empty header value gets
    // no bypass, since such a request falls back to cookie authentication.
    if presented_api_key(request.headers()).is_some() {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let cookie = extract_cookie(request.headers(), CSRF_COOKIE_NAME);

    match check(header.as_deref(), cookie.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            // Missing and mismatch are deliberately indistinguishable outward.
            debug!("CSRF check failed: {rejection:?}");
            (
                StatusCode::FORBIDDEN,
                Json(MessageResponse {
                    message: "CSRF token missing or invalid".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_pair_is_allowed() {
        assert_eq!(check(Some("tok"), Some("tok")), Ok(()));
    }

    #[test]
    fn missing_either_half_rejects() {
        assert_eq!(check(None, Some("tok")), Err(Rejection::Missing));
        assert_eq!(check(Some("tok"), None), Err(Rejection::Missing));
        assert_eq!(check(None, None), Err(Rejection::Missing));
        assert_eq!(check(Some(""), Some("tok")), Err(Rejection::Missing));
        assert_eq!(check(Some("tok"), Some("")), Err(Rejection::Missing));
    }

    #[test]
    fn mismatched_pair_rejects() {
        assert_eq!(check(Some("tok"), Some("other")), Err(Rejection::Mismatch));
    }

    #[test]
    fn safe_methods_bypass() {
        assert!(!is_protected(&Method::GET));
        assert!(!is_protected(&Method::HEAD));
        assert!(!is_protected(&Method::OPTIONS));
        assert!(is_protected(&Method::POST));
        assert!(is_protected(&Method::PUT));
        assert!(is_protected(&Method::PATCH));
        assert!(is_protected(&Method::DELETE));
    }

    #[test]
    fn bootstrap_endpoints_are_exempt() {
        assert!(EXEMPT_PATHS.contains(&"/v1/auth/token"));
        assert!(EXEMPT_PATHS.contains(&"/v1/auth/refresh"));
        assert!(!EXEMPT_PATHS.contains(&"/v1/api-keys"));
    }
}
