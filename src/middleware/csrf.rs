//! CSRF protection for the OAuth login round trip.
//!
//! `/oauth2/start` stores a signed random nonce in `{cookie_name}_csrf` and
//! sends `state = "{nonce}:{rd}"` to the provider. `/oauth2/callback` only
//! proceeds when the nonce in `state` matches the signed cookie.

use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use std::time::{Duration, SystemTime};

use crate::error::AppError;
use crate::session::cookie::{sign_value, verify_value};
use crate::session::store::find_cookie;
use crate::session::{CookieOptions, SessionCookie};

pub const CSRF_COOKIE_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// 32 random bytes, base64url encoded.
pub fn generate_nonce() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Keep `rd` only when it is a path on this host.
pub fn sanitize_redirect(rd: Option<&str>) -> String {
    match rd {
        Some(rd) if rd.starts_with('/') && !rd.starts_with("//") && !rd.contains('\\') => {
            rd.to_string()
        }
        _ => "/".to_string(),
    }
}

pub fn encode_state(nonce: &str, rd: &str) -> String {
    format!("{nonce}:{rd}")
}

/// Split `state` into nonce and redirect. The redirect is sanitized again.
pub fn decode_state(state: &str) -> Option<(&str, String)> {
    let (nonce, rd) = state.split_once(':')?;
    if nonce.is_empty() {
        return None;
    }
    Some((nonce, sanitize_redirect(Some(rd))))
}

/// The signed nonce cookie set by `/oauth2/start`.
pub fn csrf_cookie(
    opts: &CookieOptions,
    name: &str,
    secret: &str,
    nonce: &str,
    now: SystemTime,
) -> SessionCookie {
    SessionCookie::new(
        opts,
        name,
        sign_value(secret.as_bytes(), nonce, now),
        now + CSRF_COOKIE_LIFETIME,
    )
}

/// Removal cookie for the nonce, sent once the callback has used it.
pub fn clear_csrf_cookie(opts: &CookieOptions, name: &str) -> SessionCookie {
    SessionCookie::new(opts, name, "", SystemTime::UNIX_EPOCH)
}

/// Check the nonce from `state` against the signed cookie on the request.
pub fn verify_csrf(
    headers: &HeaderMap,
    name: &str,
    secret: &str,
    nonce: &str,
    now: SystemTime,
) -> Result<(), AppError> {
    let signed = find_cookie(headers, name).ok_or(AppError::CsrfFailed("Missing state cookie"))?;
    let expected = verify_value(secret.as_bytes(), signed, CSRF_COOKIE_LIFETIME, now)
        .ok_or(AppError::CsrfFailed("Invalid or expired state cookie"))?;

    if expected != nonce {
        return Err(AppError::CsrfFailed("State mismatch"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::COOKIE;

    const NAME: &str = "_oauth2_proxy_csrf";
    const SECRET: &str = "cookie-secret";

    fn request_with(cookie: &SessionCookie) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", cookie.name, cookie.value)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_nonce_is_random_and_url_safe() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(!a.contains(':'));
    }

    #[test]
    fn test_sanitize_redirect() {
        assert_eq!(sanitize_redirect(Some("/dashboard?x=1")), "/dashboard?x=1");
        assert_eq!(sanitize_redirect(Some("//evil.example.com")), "/");
        assert_eq!(sanitize_redirect(Some("https://evil.example.com")), "/");
        assert_eq!(sanitize_redirect(Some("/\\evil.example.com")), "/");
        assert_eq!(sanitize_redirect(Some("")), "/");
        assert_eq!(sanitize_redirect(None), "/");
    }

    #[test]
    fn test_state_encoding() {
        let state = encode_state("abc", "/app:8080/x");
        let (nonce, rd) = decode_state(&state).unwrap();
        assert_eq!(nonce, "abc");
        assert_eq!(rd, "/app:8080/x");

        assert!(decode_state("no-separator").is_none());
        assert!(decode_state(":/app").is_none());
        assert_eq!(decode_state("abc://evil").unwrap().1, "/");
    }

    #[test]
    fn test_verify_matching_nonce() {
        let now = SystemTime::now();
        let opts = CookieOptions::default();
        let cookie = csrf_cookie(&opts, NAME, SECRET, "nonce-1", now);

        assert!(verify_csrf(&request_with(&cookie), NAME, SECRET, "nonce-1", now).is_ok());
        assert_eq!(cookie.max_age_at(now), 900);
    }

    #[test]
    fn test_verify_rejects_mismatch_missing_and_expired() {
        let now = SystemTime::now();
        let opts = CookieOptions::default();
        let cookie = csrf_cookie(&opts, NAME, SECRET, "nonce-1", now);
        let headers = request_with(&cookie);

        assert!(matches!(
            verify_csrf(&headers, NAME, SECRET, "nonce-2", now),
            Err(AppError::CsrfFailed("State mismatch"))
        ));
        assert!(matches!(
            verify_csrf(&HeaderMap::new(), NAME, SECRET, "nonce-1", now),
            Err(AppError::CsrfFailed("Missing state cookie"))
        ));
        assert!(verify_csrf(&headers, NAME, "other-secret", "nonce-1", now).is_err());
        assert!(
            verify_csrf(&headers, NAME, SECRET, "nonce-1", now + Duration::from_secs(901))
                .is_err()
        );
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_csrf_cookie(&CookieOptions::default(), NAME);
        assert!(cookie.is_removal());
        assert!(cookie.to_header_value().contains("Max-Age=0"));
    }
}
