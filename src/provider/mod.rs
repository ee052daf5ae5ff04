//! Stratio Identity Server (SIS) OAuth2 provider.
//!
//! Endpoints are derived once from a root URL and never mutated afterwards.
//! The token exchange lives in [`redeem`], profile enrichment in [`profile`].

pub mod profile;
pub mod redeem;

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub use profile::{AttributeError, ProfileAttribute};
pub use redeem::parse_token_response;

pub const PROVIDER_NAME: &str = "SIS";
pub const DEFAULT_SCOPE: &str = "read";
pub const DEFAULT_ROOT_URL: &str = "https://sis/sso";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// The four provider URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    login: Url,
    redeem: Url,
    profile: Url,
    sign_out: Url,
}

impl ProviderEndpoints {
    /// Derive every endpoint from `root`, keeping its scheme, host and path prefix.
    #[must_use]
    pub fn from_root(root: &Url) -> Self {
        let base = root.path().trim_end_matches('/').to_string();
        let at = |suffix: &str| {
            let mut url = root.clone();
            url.set_path(&format!("{base}{suffix}"));
            url.set_query(None);
            url.set_fragment(None);
            url
        };

        Self {
            login: at("/oauth2.0/authorize"),
            redeem: at("/oauth2.0/accessToken"),
            profile: at("/oauth2.0/profile"),
            sign_out: at("/logout"),
        }
    }

    #[must_use]
    pub fn with_login_url(mut self, url: Url) -> Self {
        self.login = url;
        self
    }

    #[must_use]
    pub fn with_redeem_url(mut self, url: Url) -> Self {
        self.redeem = url;
        self
    }

    #[must_use]
    pub fn with_profile_url(mut self, url: Url) -> Self {
        self.profile = url;
        self
    }

    #[must_use]
    pub fn with_sign_out_url(mut self, url: Url) -> Self {
        self.sign_out = url;
        self
    }

    pub fn login(&self) -> &Url {
        &self.login
    }

    pub fn redeem(&self) -> &Url {
        &self.redeem
    }

    pub fn profile(&self) -> &Url {
        &self.profile
    }

    pub fn sign_out(&self) -> &Url {
        &self.sign_out
    }
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        let root = Url::parse(DEFAULT_ROOT_URL).expect("valid default URL");
        Self::from_root(&root)
    }
}

/// OAuth2 client secret, given inline or read from a file on every redemption.
#[derive(Clone, PartialEq, Eq)]
pub enum ClientSecret {
    Inline(String),
    File(PathBuf),
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientSecret::Inline(_) => f.write_str("Inline(<redacted>)"),
            ClientSecret::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl ClientSecret {
    pub async fn resolve(&self) -> Result<String, ProviderError> {
        match self {
            ClientSecret::Inline(secret) => Ok(secret.clone()),
            ClientSecret::File(path) => {
                let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                    ProviderError::ClientSecret(format!(
                        "cannot read client secret file {}: {e}",
                        path.display()
                    ))
                })?;
                let secret = contents.trim_end();
                if secret.is_empty() {
                    return Err(ProviderError::ClientSecret(format!(
                        "client secret file {} is empty",
                        path.display()
                    )));
                }
                Ok(secret.to_string())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("missing code")]
    MissingCode,

    #[error("client secret unavailable: {0}")]
    ClientSecret(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("error getting user info: {0}")]
    ProfileFetch(String),

    #[error("error getting user info: {0}")]
    ProfileTransport(#[source] reqwest::Error),
}

impl ProviderError {
    /// Whether the provider could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProviderError::Transport(_) | ProviderError::ProfileTransport(_)
        )
    }
}

/// SIS provider client. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SisProvider {
    endpoints: ProviderEndpoints,
    client_id: String,
    client_secret: ClientSecret,
    scope: String,
    protected_resource: Option<Url>,
    http: reqwest::Client,
    timeout: Duration,
}

impl SisProvider {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: ClientSecret,
        endpoints: ProviderEndpoints,
    ) -> Self {
        Self {
            endpoints,
            client_id: client_id.into(),
            client_secret,
            scope: DEFAULT_SCOPE.into(),
            protected_resource: None,
            http: reqwest::Client::new(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Resource sent as `resource` on redemption.
    #[must_use]
    pub fn with_protected_resource(mut self, resource: Option<Url>) -> Self {
        self.protected_resource = resource;
        self
    }

    /// Use a shared HTTP client (connection pool reuse).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Per-request timeout for every outbound call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Provider login URL the browser is sent to.
    pub fn login_url(&self, redirect_uri: &str, state: &str) -> String {
        let mut url = self.endpoints.login.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.scope)
            .append_pair("state", state);
        url.into()
    }

    /// Provider sign-out URL, with `rd` when a return target is given.
    pub fn sign_out_url(&self, rd: &str) -> String {
        let mut url = self.endpoints.sign_out.clone();
        if !rd.is_empty() {
            url.query_pairs_mut().clear().append_pair("rd", rd);
        }
        url.into()
    }
}
