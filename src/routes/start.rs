//! GET /oauth2/start

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use std::sync::Arc;
use std::time::SystemTime;

use crate::middleware::csrf;
use crate::types::StartParams;

/// Begin a login: set the CSRF nonce cookie and send the browser to the provider.
pub async fn start(
    State(state): State<Arc<crate::AppState>>,
    Query(params): Query<StartParams>,
) -> impl IntoResponse {
    let rd = csrf::sanitize_redirect(params.rd.as_deref());
    let nonce = csrf::generate_nonce();

    let cookie = csrf::csrf_cookie(
        state.store.cookie_options(),
        &state.config.csrf_cookie_name(),
        &state.config.cookie_secret,
        &nonce,
        SystemTime::now(),
    );
    let login_url = state
        .provider
        .login_url(&state.config.redirect_url, &csrf::encode_state(&nonce, &rd));

    tracing::debug!(%rd, "Redirecting to provider login");

    (
        AppendHeaders([(SET_COOKIE, cookie.to_header_value())]),
        Redirect::temporary(&login_url),
    )
}
