//! GET /oauth2/callback

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use std::sync::Arc;
use std::time::SystemTime;

use crate::AppState;
use crate::error::AppError;
use crate::middleware::csrf;
use crate::ocsf;
use crate::session::{SessionCookie, SessionState};
use crate::types::{CallbackParams, seconds_left};

/// OAuth callback: check state, redeem the code, enrich, set the session cookie.
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(ref error) = params.error {
        let detail = params.error_description.as_deref().unwrap_or(error);
        ocsf::authentication_event(
            ocsf::ACTIVITY_LOGON,
            ocsf::STATUS_FAILURE,
            None,
            None,
            &format!("Provider returned error: {error}"),
        );
        return Err(AppError::LoginFailed(format!("{error}: {detail}")));
    }

    let (nonce, rd) = params
        .state
        .as_deref()
        .and_then(csrf::decode_state)
        .ok_or(AppError::CsrfFailed("Invalid state parameter"))?;

    let csrf_cookie_name = state.config.csrf_cookie_name();
    csrf::verify_csrf(
        &headers,
        &csrf_cookie_name,
        &state.config.cookie_secret,
        nonce,
        SystemTime::now(),
    )?;

    let code = params.code.as_deref().unwrap_or_default();
    let (session, cookie) = match login(&state, code).await {
        Ok(done) => done,
        Err(e) => {
            ocsf::authentication_event(
                ocsf::ACTIVITY_LOGON,
                ocsf::STATUS_FAILURE,
                None,
                None,
                &format!("Login failed: {e}"),
            );
            return Err(e);
        }
    };

    ocsf::authentication_event(
        ocsf::ACTIVITY_LOGON,
        ocsf::STATUS_SUCCESS,
        Some(&session.user),
        Some(&session.email),
        "Login succeeded",
    );
    tracing::info!(
        user = %session.user,
        expires_in = ?seconds_left(&session),
        "Session created"
    );

    let clear_csrf = csrf::clear_csrf_cookie(state.store.cookie_options(), &csrf_cookie_name);
    Ok((
        AppendHeaders([
            (SET_COOKIE, cookie.to_header_value()),
            (SET_COOKIE, clear_csrf.to_header_value()),
        ]),
        Redirect::temporary(&rd),
    ))
}

/// Redeem, enrich and seal a new session.
async fn login(state: &AppState, code: &str) -> Result<(SessionState, SessionCookie), AppError> {
    let mut session = state
        .provider
        .redeem(&state.config.redirect_url, code)
        .await?;
    state.provider.enrich_session(&mut session).await?;
    let cookie = state.store.save(&mut session)?;
    Ok((session, cookie))
}
