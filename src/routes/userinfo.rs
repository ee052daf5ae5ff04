//! GET /oauth2/userinfo

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use std::sync::Arc;

use crate::error::AppError;
use crate::types::UserInfoResponse;

/// Return the identity carried by the session cookie.
pub async fn userinfo(
    State(state): State<Arc<crate::AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserInfoResponse>, AppError> {
    let session = state.store.load(&headers)?;
    Ok(Json(UserInfoResponse::from(&session)))
}
