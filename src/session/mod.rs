//! Stateless sessions carried in signed cookies.
//!
//! A [`SessionState`] is turned into a compact JWT by the [`codec`], written
//! to (and read back from) a cookie by the [`store`], and never persisted
//! anywhere else. Key material is resolved once by [`keys`].

pub mod codec;
pub mod cookie;
pub mod keys;
pub mod store;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use codec::{Claims, ExpiryPolicy, SessionCodec, SigningStrategy};
pub use keys::{JwtKeyOptions, KeySource, SigningAlgorithm, load_signing_strategy};
pub use store::{CookieOptions, CookieSessionStore, SameSite, SessionCookie};

/// Identity state for one authenticated user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Subject identifier (`uid`).
    pub user: String,
    /// Display name (`cn`).
    pub preferred_username: String,
    pub username: String,
    pub email: String,
    pub tenant: String,
    pub groups: Vec<String>,
    pub tenants: Vec<String>,
    /// Provider access token. Not part of the claims schema.
    pub access_token: String,
    pub created_at: Option<SystemTime>,
    pub expires_on: Option<SystemTime>,
}

impl SessionState {
    /// Whether the session has an expiry at or before `now`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_on.is_some_and(|exp| exp <= now)
    }

    /// Time left before expiry, zero once expired, `None` without an expiry.
    pub fn expires_in(&self, now: SystemTime) -> Option<Duration> {
        self.expires_on
            .map(|exp| exp.duration_since(now).unwrap_or_default())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store configuration error: {0}")]
    Configuration(String),

    #[error("invalid session key: {0}")]
    KeyFormat(String),

    #[error("invalid session: {0}")]
    InvalidSession(String),

    #[error("session cookie not found")]
    MissingCookie,

    #[error("invalid session token: {0}")]
    InvalidToken(String),

    #[error("session token expired")]
    ExpiredToken,
}

impl SessionError {
    /// Whether the error means "no usable session" rather than a server fault.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            SessionError::MissingCookie | SessionError::InvalidToken(_) | SessionError::ExpiredToken
        )
    }
}

/// Whole seconds since the Unix epoch; times before the epoch clamp to zero.
pub fn unix_seconds(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

pub fn from_unix_seconds(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// Drop the sub-second part of `t`.
pub fn truncate_to_seconds(t: SystemTime) -> SystemTime {
    from_unix_seconds(unix_seconds(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_drops_subseconds() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_999);
        assert_eq!(truncate_to_seconds(t), from_unix_seconds(1_700_000_000));
    }

    #[test]
    fn test_unix_seconds_before_epoch_clamps() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(unix_seconds(before), 0);
    }

    #[test]
    fn test_is_expired_at() {
        let now = SystemTime::now();
        let mut session = SessionState::default();
        assert!(!session.is_expired_at(now));

        session.expires_on = Some(now);
        assert!(session.is_expired_at(now));

        session.expires_on = Some(now + Duration::from_secs(60));
        assert!(!session.is_expired_at(now));
        assert_eq!(session.expires_in(now), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_unauthenticated_classification() {
        assert!(SessionError::MissingCookie.is_unauthenticated());
        assert!(SessionError::ExpiredToken.is_unauthenticated());
        assert!(SessionError::InvalidToken("bad".into()).is_unauthenticated());
        assert!(!SessionError::KeyFormat("bad".into()).is_unauthenticated());
        assert!(!SessionError::Configuration("bad".into()).is_unauthenticated());
    }
}
