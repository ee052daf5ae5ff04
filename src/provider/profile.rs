//! Session enrichment from the SIS profile endpoint.
//!
//! The profile reply carries an `attributes` array of single-key objects:
//!
//! ```json
//! {"id":"admin","attributes":[{"uid":"admin"},{"groups":["admins"]},{"mail":"admin@example.com"}]}
//! ```
//!
//! Attributes are folded into the session in list order, so a key that
//! appears twice keeps its last value.

use serde_json::Value;

use super::{ProviderError, SisProvider};
use crate::session::SessionState;

/// A known profile attribute with its decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileAttribute {
    Uid(String),
    Cn(String),
    Username(String),
    Mail(String),
    Tenant(String),
    Groups(Vec<String>),
    Tenants(Vec<String>),
}

#[derive(Debug, thiserror::Error)]
pub enum AttributeError {
    #[error("attribute {key}: expected a string, got {value}")]
    ExpectedString { key: String, value: String },

    #[error("attribute {key}: expected a list of strings, got {value}")]
    ExpectedStringList { key: String, value: String },
}

impl ProfileAttribute {
    /// Decode one attribute. `None` for keys this provider does not map.
    pub fn parse(key: &str, value: &Value) -> Option<Result<Self, AttributeError>> {
        let attr = match key {
            "uid" => string(key, value).map(ProfileAttribute::Uid),
            "cn" => string(key, value).map(ProfileAttribute::Cn),
            "username" => string(key, value).map(ProfileAttribute::Username),
            "mail" => string(key, value).map(ProfileAttribute::Mail),
            "tenant" => string(key, value).map(ProfileAttribute::Tenant),
            "groups" => string_list(key, value).map(ProfileAttribute::Groups),
            "tenants" => string_list(key, value).map(ProfileAttribute::Tenants),
            _ => return None,
        };
        Some(attr)
    }

    pub fn apply(self, session: &mut SessionState) {
        match self {
            ProfileAttribute::Uid(v) => session.user = v,
            ProfileAttribute::Cn(v) => session.preferred_username = v,
            ProfileAttribute::Username(v) => session.username = v,
            ProfileAttribute::Mail(v) => session.email = v,
            ProfileAttribute::Tenant(v) => session.tenant = v,
            ProfileAttribute::Groups(v) => session.groups = v,
            ProfileAttribute::Tenants(v) => session.tenants = v,
        }
    }
}

fn string(key: &str, value: &Value) -> Result<String, AttributeError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AttributeError::ExpectedString {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn string_list(key: &str, value: &Value) -> Result<Vec<String>, AttributeError> {
    let wrong_type = || AttributeError::ExpectedStringList {
        key: key.to_string(),
        value: value.to_string(),
    };

    value
        .as_array()
        .ok_or_else(wrong_type)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(wrong_type))
        .collect()
}

/// Fold the `attributes` of a profile document into `session`.
///
/// Unknown keys are ignored. Values of the wrong type are logged and skipped.
pub fn apply_profile(profile: &Value, session: &mut SessionState) {
    let Some(attributes) = profile.get("attributes").and_then(Value::as_array) else {
        return;
    };

    for (key, value) in attributes.iter().filter_map(Value::as_object).flatten() {
        match ProfileAttribute::parse(key, value) {
            Some(Ok(attr)) => attr.apply(session),
            Some(Err(e)) => tracing::warn!(error = %e, "Skipping profile attribute"),
            None => {}
        }
    }
}

impl SisProvider {
    /// Fetch the user's profile with the session's access token and fill in
    /// identity fields. The session is left untouched on failure.
    pub async fn enrich_session(&self, session: &mut SessionState) -> Result<(), ProviderError> {
        if session.access_token.is_empty() {
            return Err(ProviderError::ProfileFetch("missing access token".into()));
        }

        let resp = self
            .http
            .get(self.endpoints.profile().clone())
            .timeout(self.timeout)
            .bearer_auth(&session.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(ProviderError::ProfileTransport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::ProfileFetch(format!(
                "unexpected status {status}: {body}"
            )));
        }

        let profile: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::ProfileFetch(e.to_string()))?;

        apply_profile(&profile, session);
        Ok(())
    }
}
