//! Shared request/response DTOs.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::session::{SessionState, unix_seconds};

/// GET /oauth2/start query.
#[derive(Debug, Default, Deserialize)]
pub struct StartParams {
    pub rd: Option<String>,
}

/// GET /oauth2/callback query, as sent back by the provider.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /oauth2/sign_out query.
#[derive(Debug, Default, Deserialize)]
pub struct SignOutParams {
    pub rd: Option<String>,
}

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub algorithm: String,
}

/// GET /oauth2/userinfo response.
#[derive(Debug, Serialize, PartialEq)]
pub struct UserInfoResponse {
    pub user: String,
    pub email: String,
    #[serde(rename = "preferredUsername")]
    pub preferred_username: String,
    pub username: String,
    pub tenant: String,
    pub groups: Vec<String>,
    pub tenants: Vec<String>,
    /// Session expiry, Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
}

impl From<&SessionState> for UserInfoResponse {
    fn from(session: &SessionState) -> Self {
        Self {
            user: session.user.clone(),
            email: session.email.clone(),
            preferred_username: session.preferred_username.clone(),
            username: session.username.clone(),
            tenant: session.tenant.clone(),
            groups: session.groups.clone(),
            tenants: session.tenants.clone(),
            expires: session.expires_on.map(unix_seconds),
        }
    }
}

/// Seconds left on a session, for logging.
pub fn seconds_left(session: &SessionState) -> Option<u64> {
    session
        .expires_in(SystemTime::now())
        .map(|d| d.as_secs())
}
