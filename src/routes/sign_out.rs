//! GET /oauth2/sign_out

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use std::sync::Arc;

use crate::error::AppError;
use crate::ocsf;
use crate::session::SessionError;
use crate::types::SignOutParams;

/// Clear the session cookie and hand over to the provider's sign-out page.
///
/// Signing out without a session cookie is not an error.
pub async fn sign_out(
    State(state): State<Arc<crate::AppState>>,
    headers: HeaderMap,
    Query(params): Query<SignOutParams>,
) -> Result<impl IntoResponse, AppError> {
    // Best-effort identity for the audit event
    let session = state.store.load(&headers).ok();

    let removal = match state.store.clear(&headers) {
        Ok(cookie) => Some(cookie),
        Err(SessionError::MissingCookie) => None,
        Err(e) => return Err(e.into()),
    };

    if removal.is_some() {
        ocsf::authentication_event(
            ocsf::ACTIVITY_LOGOFF,
            ocsf::STATUS_SUCCESS,
            session.as_ref().map(|s| s.user.as_str()),
            session.as_ref().map(|s| s.email.as_str()),
            "User logged out",
        );
    }

    let set_cookies: Vec<_> = removal
        .into_iter()
        .map(|cookie| (SET_COOKIE, cookie.to_header_value()))
        .collect();
    let target = state
        .provider
        .sign_out_url(params.rd.as_deref().unwrap_or_default());

    Ok((AppendHeaders(set_cookies), Redirect::temporary(&target)))
}
