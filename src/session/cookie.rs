//! HMAC-SHA256 signed cookie values with an issue time.
//!
//! Format: `base64url(value).issued_at.base64url(hmac(secret, value "|" issued_at))`
//!
//! Used for short-lived values such as the OAuth CSRF nonce. The issue time
//! is covered by the MAC so a client cannot extend the value's lifetime.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime};

use super::unix_seconds;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &[u8], value: &str, issued_at: u64) -> HmacSha256 {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC key length is always valid");
    mac.update(value.as_bytes());
    mac.update(b"|");
    mac.update(issued_at.to_string().as_bytes());
    mac
}

/// Sign `value` as issued at `now`.
pub fn sign_value(secret: &[u8], value: &str, now: SystemTime) -> String {
    let issued_at = unix_seconds(now);
    let signature = mac_for(secret, value, issued_at).finalize().into_bytes();

    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(value.as_bytes()),
        issued_at,
        URL_SAFE_NO_PAD.encode(signature)
    )
}

/// Verify a signed value and return the original, if it is no older than `max_age`.
pub fn verify_value(
    secret: &[u8],
    signed: &str,
    max_age: Duration,
    now: SystemTime,
) -> Option<String> {
    let mut parts = signed.splitn(3, '.');
    let (value_part, issued_part, sig_part) = (parts.next()?, parts.next()?, parts.next()?);

    let value = String::from_utf8(URL_SAFE_NO_PAD.decode(value_part).ok()?).ok()?;
    let issued_at: u64 = issued_part.parse().ok()?;
    let signature = URL_SAFE_NO_PAD.decode(sig_part).ok()?;

    mac_for(secret, &value, issued_at)
        .verify_slice(&signature)
        .ok()?;

    let now = unix_seconds(now);
    if issued_at > now || now - issued_at > max_age.as_secs() {
        return None;
    }

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_AGE: Duration = Duration::from_secs(900);

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let now = SystemTime::now();
        let signed = sign_value(b"cookie-secret", "nonce-123", now);
        assert_eq!(
            verify_value(b"cookie-secret", &signed, MAX_AGE, now),
            Some("nonce-123".to_string())
        );
    }

    #[test]
    fn test_wrong_secret_fails() {
        let now = SystemTime::now();
        let signed = sign_value(b"secret-a", "nonce", now);
        assert_eq!(verify_value(b"secret-b", &signed, MAX_AGE, now), None);
    }

    #[test]
    fn test_tampered_value_fails() {
        let now = SystemTime::now();
        let signed = sign_value(b"secret", "real-nonce", now);
        let (_, rest) = signed.split_once('.').unwrap();
        let tampered = format!("{}.{}", URL_SAFE_NO_PAD.encode(b"fake-nonce"), rest);
        assert_eq!(verify_value(b"secret", &tampered, MAX_AGE, now), None);
    }

    #[test]
    fn test_extended_issue_time_fails() {
        let now = SystemTime::now();
        let signed = sign_value(b"secret", "nonce", now);
        let parts: Vec<&str> = signed.split('.').collect();
        let later = unix_seconds(now) + 3600;
        let tampered = format!("{}.{}.{}", parts[0], later, parts[2]);
        assert_eq!(
            verify_value(b"secret", &tampered, MAX_AGE, now + Duration::from_secs(3600)),
            None
        );
    }

    #[test]
    fn test_stale_value_fails() {
        let issued = SystemTime::now() - Duration::from_secs(1000);
        let signed = sign_value(b"secret", "nonce", issued);
        assert_eq!(
            verify_value(b"secret", &signed, MAX_AGE, SystemTime::now()),
            None
        );
    }

    #[test]
    fn test_malformed_values_fail() {
        let now = SystemTime::now();
        for signed in ["", "nodots", "a.b", "!!!.1.!!!", "bm9uY2U.notanumber.c2ln"] {
            assert_eq!(verify_value(b"secret", signed, MAX_AGE, now), None);
        }
    }

    #[test]
    fn test_value_with_colons_and_unicode() {
        let now = SystemTime::now();
        for value in ["abc:/path?x=1", "spaces here", "\u{1F600}"] {
            let signed = sign_value(b"secret", value, now);
            assert_eq!(
                verify_value(b"secret", &signed, MAX_AGE, now),
                Some(value.to_string())
            );
        }
    }
}
