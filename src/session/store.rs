//! Cookie-backed session store: `save`, `load` and `clear`.
//!
//! The whole session lives in the cookie value as a signed token; there is
//! no server-side state. Clearing a cookie that the request does not carry
//! is reported as [`SessionError::MissingCookie`]; callers that want an
//! idempotent logout treat that as a no-op.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use std::time::{Duration, SystemTime};

use super::codec::SessionCodec;
use super::{SessionError, SessionState};

/// How far in the past a clearing cookie's expiry is set.
const CLEAR_BACKDATE: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl std::str::FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(format!("invalid SameSite value: {other}")),
        }
    }
}

/// Cookie attributes shared by every cookie the gateway writes.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieOptions {
    pub name: String,
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: "_oauth2_proxy".into(),
            domain: None,
            path: "/".into(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }
}

/// A cookie to be written on the response.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub expires: SystemTime,
    pub options: CookieOptions,
}

impl SessionCookie {
    /// Build a cookie with `opts`' attributes under an explicit name.
    pub fn new(
        opts: &CookieOptions,
        name: impl Into<String>,
        value: impl Into<String>,
        expires: SystemTime,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires,
            options: opts.clone(),
        }
    }

    /// Seconds until `expires`, zero when it is already in the past.
    pub fn max_age_at(&self, now: SystemTime) -> u64 {
        self.expires
            .duration_since(now)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Whether this cookie instructs the client to discard its value.
    pub fn is_removal(&self) -> bool {
        self.value.is_empty() && self.expires <= SystemTime::now()
    }

    /// Render the `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let opts = &self.options;
        let mut parts = vec![
            format!("{}={}", self.name, self.value),
            format!("Max-Age={}", self.max_age_at(SystemTime::now())),
            format!("Path={}", opts.path),
        ];
        if let Some(domain) = &opts.domain {
            parts.push(format!("Domain={domain}"));
        }
        if opts.http_only {
            parts.push("HttpOnly".into());
        }
        if opts.secure {
            parts.push("Secure".into());
        }
        parts.push(format!("SameSite={}", opts.same_site.as_str()));
        parts.join("; ")
    }
}

/// Stores sessions in a single signed cookie.
pub struct CookieSessionStore {
    codec: SessionCodec,
    cookie: CookieOptions,
}

impl CookieSessionStore {
    pub fn new(codec: SessionCodec, cookie: CookieOptions) -> Self {
        Self { codec, cookie }
    }

    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    pub fn cookie_options(&self) -> &CookieOptions {
        &self.cookie
    }

    /// Encode `session` and wrap the token in the session cookie.
    ///
    /// May stamp `created_at`/`expires_on` on `session`, see [`SessionCodec::encode`].
    pub fn save(&self, session: &mut SessionState) -> Result<SessionCookie, SessionError> {
        let token = self.codec.encode(session)?;
        let expires = session.expires_on.ok_or_else(|| {
            SessionError::InvalidSession("session has no expiry after encoding".into())
        })?;

        Ok(SessionCookie::new(&self.cookie, &self.cookie.name, token, expires))
    }

    /// Read and verify the session cookie from request headers.
    pub fn load(&self, headers: &HeaderMap) -> Result<SessionState, SessionError> {
        let token = find_cookie(headers, &self.cookie.name).ok_or(SessionError::MissingCookie)?;
        self.codec.decode(token)
    }

    /// Build a cookie that makes the client drop its session cookie.
    pub fn clear(&self, headers: &HeaderMap) -> Result<SessionCookie, SessionError> {
        if find_cookie(headers, &self.cookie.name).is_none() {
            return Err(SessionError::MissingCookie);
        }

        Ok(SessionCookie::new(
            &self.cookie,
            &self.cookie.name,
            "",
            SystemTime::now() - CLEAR_BACKDATE,
        ))
    }
}

/// Find a cookie by name across every `Cookie` header of a request.
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|header| parse_cookie(header, name))
}

/// Parse a specific cookie from a Cookie header value.
fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some(value) = trimmed.strip_prefix(name)
            && let Some(value) = value.strip_prefix('=')
        {
            return Some(value);
        }
    }
    None
}
