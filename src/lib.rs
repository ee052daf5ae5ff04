//! SIS token handler: OAuth2 login against a Stratio Identity Server with
//! stateless, JWT-backed session cookies.
//!
//! The provider is only contacted during login. Every later request is
//! authenticated from the signed session cookie alone.

pub mod config;
pub mod error;
pub mod middleware;
pub mod ocsf;
pub mod provider;
pub mod routes;
pub mod session;
pub mod types;

use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::provider::SisProvider;
use crate::session::{CookieSessionStore, SessionCodec, SessionError, load_signing_strategy};

/// Shared application state available to all route handlers.
pub struct AppState {
    pub config: Config,
    pub provider: SisProvider,
    pub store: CookieSessionStore,
}

impl AppState {
    /// Load the signing key and wire the provider and session store.
    pub fn from_config(config: Config) -> Result<Self, SessionError> {
        let strategy = load_signing_strategy(&config.jwt_key_options())?;
        let store = CookieSessionStore::new(
            SessionCodec::new(strategy, config.expiry_policy()),
            config.cookie_options(),
        );

        let provider = SisProvider::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.provider_endpoints(),
        )
        .with_scope(config.scope.clone())
        .with_protected_resource(config.protected_resource.clone())
        .with_timeout(config.http_timeout);

        Ok(Self {
            config,
            provider,
            store,
        })
    }
}

/// Build the Axum router with all routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    let oauth_routes = Router::new()
        .route("/start", get(routes::start::start))
        .route("/callback", get(routes::callback::oauth_callback))
        .route("/sign_out", get(routes::sign_out::sign_out))
        .route("/userinfo", get(routes::userinfo::userinfo))
        .route("/auth", get(routes::auth::auth));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/oauth2", oauth_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
