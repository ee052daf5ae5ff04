//! Test utilities: fixture keys, test app builder, wiremock SIS backend.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use serde_json::{Value, json};
use sis_token_handler::config::Config;
use sis_token_handler::session::{SessionState, SigningAlgorithm};
use sis_token_handler::{AppState, create_app};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION_KEY: &str = include_str!("../fixtures/session_key_pkcs1.pem");
pub const OTHER_KEY: &str = include_str!("../fixtures/other_key_pkcs8.pem");

pub const SESSION_COOKIE: &str = "_oauth2_proxy";
pub const CSRF_COOKIE: &str = "_oauth2_proxy_csrf";

/// RS256 config pointing every SIS endpoint at `root` (e.g. a wiremock server + `/sso`).
pub fn test_config(root: &str) -> Config {
    Config {
        sis_root_url: Url::parse(root).unwrap(),
        jwt_session_key: Some(SESSION_KEY.into()),
        jwt_session_algorithm: SigningAlgorithm::Rs256,
        ..Config::test_default()
    }
}

pub fn build_test_app(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::from_config(config).expect("test state"));
    (create_app(state.clone()), state)
}

/// Standard SIS profile reply.
pub fn sample_profile() -> Value {
    json!({
        "id": "admin",
        "attributes": [
            {"uid": "admin"},
            {"tenant": "NONE"},
            {"roles": []},
            {"groups": ["admins", "managers"]},
            {"username": "admin"},
            {"tenants": ["NONE", "NUNI"]},
            {"cn": "Administrator"},
            {"mail": "admin@example.com"}
        ]
    })
}

/// Mount a healthy SIS backend: form-encoded token reply and the sample profile.
pub async fn mount_sis(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sso/oauth2.0/accessToken"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("access_token=at-sis&expires=3600"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sso/oauth2.0/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_profile()))
        .mount(server)
        .await;
}

/// A signed session cookie value for `session`, minted by the app's own store.
pub fn session_token(state: &AppState, mut session: SessionState) -> String {
    state.store.save(&mut session).unwrap().value
}

pub fn active_session() -> SessionState {
    SessionState {
        user: "admin".into(),
        preferred_username: "Administrator".into(),
        email: "admin@example.com".into(),
        groups: vec!["admins".into()],
        expires_on: Some(SystemTime::now() + Duration::from_secs(3600)),
        ..SessionState::default()
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("Cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// All `Set-Cookie` headers of a response.
pub fn set_cookies<B>(resp: &Response<B>) -> Vec<String> {
    resp.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(String::from)
        .collect()
}

/// The `Set-Cookie` header for `name`, if any.
pub fn set_cookie_for<B>(resp: &Response<B>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookies(resp).into_iter().find(|c| c.starts_with(&prefix))
}

/// The value part of the `Set-Cookie` header for `name`.
pub fn cookie_value<B>(resp: &Response<B>, name: &str) -> Option<String> {
    let header = set_cookie_for(resp, name)?;
    let pair = header.split(';').next()?;
    pair.strip_prefix(&format!("{name}=")).map(String::from)
}

pub fn location<B>(resp: &Response<B>) -> String {
    resp.headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
