//! GET /oauth2/auth
//!
//! Sub-request endpoint for a fronting proxy: `202` with the identity in
//! `X-Auth-Request-*` headers when the session cookie is valid, `401` otherwise.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use std::sync::Arc;

use crate::error::AppError;
use crate::session::SessionState;

/// Identity headers for the upstream request. Empty fields are left out, as
/// are values that cannot be sent as a header.
pub fn identity_headers(session: &SessionState) -> Vec<(HeaderName, HeaderValue)> {
    [
        ("x-auth-request-user", session.user.clone()),
        ("x-auth-request-email", session.email.clone()),
        (
            "x-auth-request-preferred-username",
            session.preferred_username.clone(),
        ),
        ("x-auth-request-username", session.username.clone()),
        ("x-auth-request-tenant", session.tenant.clone()),
        ("x-auth-request-groups", session.groups.join(",")),
        ("x-auth-request-tenants", session.tenants.join(",")),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .filter_map(|(name, value)| match HeaderValue::from_str(&value) {
        Ok(value) => Some((HeaderName::from_static(name), value)),
        Err(_) => {
            tracing::warn!(
                header = name,
                user = %session.user,
                "Skipping identity header with invalid characters"
            );
            None
        }
    })
    .collect()
}

pub async fn auth(
    State(state): State<Arc<crate::AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let session = state.store.load(&headers)?;
    Ok((StatusCode::ACCEPTED, AppendHeaders(identity_headers(&session))))
}
