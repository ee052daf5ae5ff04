//! Authorization code → access token.
//!
//! SIS answers the token request either with a JSON object or with a
//! form-encoded body (`access_token=...&expires=...`). Both are accepted;
//! JSON is tried first.

use serde_json::{Map, Value};
use std::time::{Duration, SystemTime};

use super::{ProviderError, SisProvider};
use crate::session::{SessionState, truncate_to_seconds};

impl SisProvider {
    /// Exchange `code` for an access token and build the initial session.
    pub async fn redeem(
        &self,
        redirect_url: &str,
        code: &str,
    ) -> Result<SessionState, ProviderError> {
        if code.is_empty() {
            return Err(ProviderError::MissingCode);
        }
        let client_secret = self.client_secret.resolve().await?;

        let mut params = vec![
            ("redirect_uri", redirect_url.to_string()),
            ("client_id", self.client_id.clone()),
            ("client_secret", client_secret),
            ("code", code.to_string()),
            ("grant_type", "authorization_code".to_string()),
        ];
        if let Some(resource) = &self.protected_resource {
            params.push(("resource", resource.to_string()));
        }

        let resp = self
            .http
            .post(self.endpoints.redeem().clone())
            .timeout(self.timeout)
            .form(&params)
            .send()
            .await?;

        // Capture status before consuming the body
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(ProviderError::TokenExchange(format!(
                "unexpected status {status}: {body}"
            )));
        }

        parse_token_response(&body, SystemTime::now())
    }
}

/// Turn a token endpoint reply into a session issued at `now`.
pub fn parse_token_response(body: &str, now: SystemTime) -> Result<SessionState, ProviderError> {
    let (access_token, expires) = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => json_fields(&map, body)?,
        _ => form_fields(body)?,
    };
    let expires_on = truncate_to_seconds(now)
        .checked_add(Duration::from_secs(expires))
        .ok_or_else(|| invalid_expires(&expires.to_string()))?;

    Ok(SessionState {
        access_token,
        created_at: Some(now),
        expires_on: Some(expires_on),
        ..SessionState::default()
    })
}

fn json_fields(map: &Map<String, Value>, body: &str) -> Result<(String, u64), ProviderError> {
    let access_token = map
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| no_access_token(body))?;

    let expires = match map.get("expires") {
        None | Some(Value::Null) => return Err(no_expiration(body)),
        Some(Value::String(s)) => parse_expires(s)?,
        Some(other) => other
            .as_u64()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| invalid_expires(&other.to_string()))?,
    };

    Ok((access_token.to_string(), expires))
}

fn form_fields(body: &str) -> Result<(String, u64), ProviderError> {
    let first = |key: &str| {
        url::form_urlencoded::parse(body.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };

    let access_token = first("access_token")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| no_access_token(body))?;

    let expires = match first("expires").filter(|e| !e.is_empty()) {
        Some(e) => parse_expires(&e)?,
        None => return Err(no_expiration(body)),
    };

    Ok((access_token, expires))
}

fn parse_expires(raw: &str) -> Result<u64, ProviderError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| invalid_expires(raw))
}

fn invalid_expires(raw: &str) -> ProviderError {
    ProviderError::InvalidResponse(format!("expires must be a positive integer, got {raw}"))
}

fn no_access_token(body: &str) -> ProviderError {
    ProviderError::TokenExchange(format!("no access token found {body}"))
}

fn no_expiration(body: &str) -> ProviderError {
    ProviderError::TokenExchange(format!("no expiration found {body}"))
}
