//! Application configuration via environment variables.
//!
//! `from_env` reads the process environment; `from_lookup` takes any
//! key → value source so tests never touch global state. Empty values
//! count as unset.

use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::provider::{
    ClientSecret, DEFAULT_HTTP_TIMEOUT, DEFAULT_ROOT_URL, DEFAULT_SCOPE, ProviderEndpoints,
};
use crate::session::{CookieOptions, ExpiryPolicy, JwtKeyOptions, SameSite, SigningAlgorithm};

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: ClientSecret,
    pub redirect_url: String,
    pub sis_root_url: Url,
    pub login_url: Option<Url>,
    pub redeem_url: Option<Url>,
    pub profile_url: Option<Url>,
    pub sign_out_url: Option<Url>,
    pub protected_resource: Option<Url>,
    pub scope: String,
    pub cookie_name: String,
    pub cookie_secret: String,
    pub cookie_domain: Option<String>,
    pub cookie_path: String,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    pub jwt_session_key: Option<String>,
    pub jwt_session_key_file: Option<PathBuf>,
    pub jwt_session_algorithm: SigningAlgorithm,
    pub session_lifetime: Option<Duration>,
    pub http_timeout: Duration,
    pub port: u16,
    pub log_format: LogFormat,
}

// Secrets stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .field("redirect_url", &self.redirect_url)
            .field("sis_root_url", &self.sis_root_url.as_str())
            .field("protected_resource", &self.protected_resource)
            .field("scope", &self.scope)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_path", &self.cookie_path)
            .field("cookie_secure", &self.cookie_secure)
            .field("cookie_same_site", &self.cookie_same_site)
            .field("jwt_session_key_file", &self.jwt_session_key_file)
            .field("jwt_session_algorithm", &self.jwt_session_algorithm)
            .field("session_lifetime", &self.session_lifetime)
            .field("http_timeout", &self.http_timeout)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required: `CLIENT_ID`, one of `CLIENT_SECRET` / `CLIENT_SECRET_FILE`,
    /// and `COOKIE_SECRET`. The session key is checked when the store is built.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnv(key.into()));
        let url = |key: &str| get(key).map(|v| parse_url(key, &v)).transpose();

        let client_secret = match (get("CLIENT_SECRET"), get("CLIENT_SECRET_FILE")) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Conflict("CLIENT_SECRET", "CLIENT_SECRET_FILE"));
            }
            (Some(secret), None) => ClientSecret::Inline(secret),
            (None, Some(path)) => ClientSecret::File(path.into()),
            (None, None) => return Err(ConfigError::MissingEnv("CLIENT_SECRET".into())),
        };

        Ok(Self {
            client_id: required("CLIENT_ID")?,
            client_secret,
            redirect_url: get("REDIRECT_URL")
                .unwrap_or_else(|| "http://localhost:4180/oauth2/callback".into()),
            sis_root_url: parse_url(
                "SIS_ROOT_URL",
                &get("SIS_ROOT_URL").unwrap_or_else(|| DEFAULT_ROOT_URL.into()),
            )?,
            login_url: url("SIS_LOGIN_URL")?,
            redeem_url: url("SIS_REDEEM_URL")?,
            profile_url: url("SIS_PROFILE_URL")?,
            sign_out_url: url("SIS_SIGN_OUT_URL")?,
            protected_resource: url("PROTECTED_RESOURCE")?,
            scope: get("SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.into()),
            cookie_name: get("COOKIE_NAME").unwrap_or_else(|| "_oauth2_proxy".into()),
            cookie_secret: required("COOKIE_SECRET")?,
            cookie_domain: get("COOKIE_DOMAIN"),
            cookie_path: get("COOKIE_PATH").unwrap_or_else(|| "/".into()),
            cookie_secure: get("COOKIE_SECURE")
                .map(|v| parse_bool("COOKIE_SECURE", &v))
                .transpose()?
                .unwrap_or(true),
            cookie_same_site: get("COOKIE_SAMESITE")
                .map(|v| v.parse::<SameSite>().map_err(|e| invalid("COOKIE_SAMESITE", e)))
                .transpose()?
                .unwrap_or_default(),
            jwt_session_key: get("JWT_SESSION_KEY"),
            jwt_session_key_file: get("JWT_SESSION_KEY_FILE").map(PathBuf::from),
            jwt_session_algorithm: get("JWT_SESSION_ALGORITHM")
                .map(|v| {
                    v.parse::<SigningAlgorithm>()
                        .map_err(|e| invalid("JWT_SESSION_ALGORITHM", e))
                })
                .transpose()?
                .unwrap_or_default(),
            session_lifetime: get("SESSION_LIFETIME")
                .map(|v| parse_duration("SESSION_LIFETIME", &v))
                .transpose()?,
            http_timeout: get("HTTP_TIMEOUT_SECS")
                .map(|v| parse_duration("HTTP_TIMEOUT_SECS", &v))
                .transpose()?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT),
            port: get("PORT")
                .map(|v| v.parse::<u16>().map_err(|e| invalid("PORT", e)))
                .transpose()?
                .unwrap_or(4180),
            log_format: match get("LOG_FORMAT").as_deref() {
                None | Some("pretty") => LogFormat::Pretty,
                Some("json") => LogFormat::Json,
                Some(other) => return Err(invalid("LOG_FORMAT", other)),
            },
        })
    }

    /// Provider endpoints: derived from the root, then individually overridden.
    pub fn provider_endpoints(&self) -> ProviderEndpoints {
        let mut endpoints = ProviderEndpoints::from_root(&self.sis_root_url);
        if let Some(url) = &self.login_url {
            endpoints = endpoints.with_login_url(url.clone());
        }
        if let Some(url) = &self.redeem_url {
            endpoints = endpoints.with_redeem_url(url.clone());
        }
        if let Some(url) = &self.profile_url {
            endpoints = endpoints.with_profile_url(url.clone());
        }
        if let Some(url) = &self.sign_out_url {
            endpoints = endpoints.with_sign_out_url(url.clone());
        }
        endpoints
    }

    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            name: self.cookie_name.clone(),
            domain: self.cookie_domain.clone(),
            path: self.cookie_path.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
        }
    }

    /// Name of the short-lived cookie that carries the login state nonce.
    pub fn csrf_cookie_name(&self) -> String {
        format!("{}_csrf", self.cookie_name)
    }

    pub fn jwt_key_options(&self) -> JwtKeyOptions {
        JwtKeyOptions {
            key: self.jwt_session_key.clone(),
            key_file: self.jwt_session_key_file.clone(),
            algorithm: self.jwt_session_algorithm,
        }
    }

    /// An explicit `SESSION_LIFETIME` wins over the algorithm's default.
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        match self.session_lifetime {
            Some(lifetime) => ExpiryPolicy::DefaultLifetime(lifetime),
            None => self.jwt_session_algorithm.default_expiry_policy(),
        }
    }
}

/// Configuration for testing, all fields settable directly.
impl Config {
    pub fn test_default() -> Self {
        Self {
            client_id: "test-client-id".into(),
            client_secret: ClientSecret::Inline("test-client-secret".into()),
            redirect_url: "http://localhost:4180/oauth2/callback".into(),
            sis_root_url: Url::parse(DEFAULT_ROOT_URL).expect("valid default URL"),
            login_url: None,
            redeem_url: None,
            profile_url: None,
            sign_out_url: None,
            protected_resource: None,
            scope: DEFAULT_SCOPE.into(),
            cookie_name: "_oauth2_proxy".into(),
            cookie_secret: "test-cookie-secret".into(),
            cookie_domain: None,
            cookie_path: "/".into(),
            cookie_secure: false,
            cookie_same_site: SameSite::Lax,
            jwt_session_key: Some("test-session-secret".into()),
            jwt_session_key_file: None,
            jwt_session_algorithm: SigningAlgorithm::Hs256,
            session_lifetime: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            port: 4180,
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("{0} and {1} are mutually exclusive")]
    Conflict(&'static str, &'static str),
}

fn invalid(key: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key: key.into(),
        reason: reason.to_string(),
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| invalid(key, e))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(invalid(key, format!("expected a boolean, got {other}"))),
    }
}

/// Whole seconds, optionally suffixed with `s`, `m` or `h`. Zero is rejected.
fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let (digits, unit) = match value.char_indices().last() {
        Some((i, 's')) => (&value[..i], 1),
        Some((i, 'm')) => (&value[..i], 60),
        Some((i, 'h')) => (&value[..i], 3600),
        _ => (value, 1),
    };
    let n: u64 = digits.parse().map_err(|e| invalid(key, e))?;
    if n == 0 {
        return Err(invalid(key, "must be greater than zero"));
    }
    n.checked_mul(unit)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid(key, "value is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("CLIENT_ID", "proxy"),
        ("CLIENT_SECRET", "secret"),
        ("COOKIE_SECRET", "cookie-secret"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        MINIMAL.iter().chain(extra).copied().collect()
    }

    #[test]
    fn test_default_creates_valid_config() {
        let cfg = Config::test_default();
        assert_eq!(cfg.client_id, "test-client-id");
        assert_eq!(cfg.port, 4180);
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.csrf_cookie_name(), "_oauth2_proxy_csrf");
    }

    #[test]
    fn test_from_lookup_defaults() {
        let cfg = Config::from_lookup(lookup(MINIMAL)).unwrap();
        assert_eq!(cfg.client_id, "proxy");
        assert_eq!(cfg.client_secret, ClientSecret::Inline("secret".into()));
        assert_eq!(cfg.redirect_url, "http://localhost:4180/oauth2/callback");
        assert_eq!(cfg.sis_root_url.as_str(), "https://sis/sso");
        assert_eq!(cfg.scope, "read");
        assert_eq!(cfg.cookie_name, "_oauth2_proxy");
        assert_eq!(cfg.cookie_path, "/");
        assert!(cfg.cookie_secure);
        assert_eq!(cfg.cookie_same_site, SameSite::Lax);
        assert_eq!(cfg.jwt_session_algorithm, SigningAlgorithm::Rs256);
        assert_eq!(cfg.expiry_policy(), ExpiryPolicy::Required);
        assert_eq!(cfg.http_timeout, Duration::from_secs(10));
        assert_eq!(cfg.port, 4180);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_from_lookup_missing_required() {
        let err = Config::from_lookup(lookup(&[("CLIENT_SECRET", "s"), ("COOKIE_SECRET", "c")]))
            .unwrap_err();
        assert!(err.to_string().contains("CLIENT_ID"));

        let err = Config::from_lookup(lookup(&[("CLIENT_ID", "p"), ("CLIENT_SECRET", "s")]))
            .unwrap_err();
        assert!(err.to_string().contains("COOKIE_SECRET"));
    }

    #[test]
    fn test_client_secret_sources() {
        let err = Config::from_lookup(lookup(&with(&[("CLIENT_SECRET_FILE", "/run/secret")])))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Conflict(_, _)));

        let cfg = Config::from_lookup(lookup(&[
            ("CLIENT_ID", "p"),
            ("CLIENT_SECRET_FILE", "/run/secret"),
            ("COOKIE_SECRET", "c"),
        ]))
        .unwrap();
        assert_eq!(cfg.client_secret, ClientSecret::File("/run/secret".into()));
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let cfg = Config::from_lookup(lookup(&with(&[("SCOPE", ""), ("PORT", "")]))).unwrap();
        assert_eq!(cfg.scope, "read");
        assert_eq!(cfg.port, 4180);
    }

    #[test]
    fn test_endpoint_overrides() {
        let cfg = Config::from_lookup(lookup(&with(&[
            ("SIS_ROOT_URL", "http://127.0.0.1:9000/sso"),
            ("SIS_PROFILE_URL", "http://profile.local/me"),
        ])))
        .unwrap();
        let endpoints = cfg.provider_endpoints();
        assert_eq!(
            endpoints.redeem().as_str(),
            "http://127.0.0.1:9000/sso/oauth2.0/accessToken"
        );
        assert_eq!(endpoints.profile().as_str(), "http://profile.local/me");
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("SIS_ROOT_URL", "not a url"),
            ("COOKIE_SECURE", "maybe"),
            ("COOKIE_SAMESITE", "sometimes"),
            ("JWT_SESSION_ALGORITHM", "ES512"),
            ("SESSION_LIFETIME", "0"),
            ("HTTP_TIMEOUT_SECS", "ten"),
            ("PORT", "70000"),
            ("LOG_FORMAT", "xml"),
        ] {
            let err = Config::from_lookup(lookup(&with(&[(key, value)]))).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{key}");
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn test_session_lifetime_overrides_policy() {
        let cfg = Config::from_lookup(lookup(&with(&[
            ("JWT_SESSION_ALGORITHM", "HS256"),
            ("SESSION_LIFETIME", "2h"),
        ])))
        .unwrap();
        assert_eq!(
            cfg.expiry_policy(),
            ExpiryPolicy::DefaultLifetime(Duration::from_secs(7200))
        );
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("K", "90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("K", "90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("K", "15m").unwrap(), Duration::from_secs(900));
        assert!(parse_duration("K", "h").is_err());
    }

    #[test]
    fn test_oversized_session_lifetime_is_invalid() {
        let err = Config::from_lookup(lookup(&with(&[(
            "SESSION_LIFETIME",
            "18446744073709551615h",
        )])))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("SESSION_LIFETIME"));

        assert_eq!(
            parse_duration("K", "5124095576030431h").unwrap(),
            Duration::from_secs(5_124_095_576_030_431 * 3600)
        );
    }

    #[test]
    fn test_cookie_options_from_config() {
        let cfg = Config::from_lookup(lookup(&with(&[
            ("COOKIE_NAME", "_sis"),
            ("COOKIE_DOMAIN", ".example.com"),
            ("COOKIE_SECURE", "false"),
            ("COOKIE_SAMESITE", "strict"),
        ])))
        .unwrap();
        let opts = cfg.cookie_options();
        assert_eq!(opts.name, "_sis");
        assert_eq!(opts.domain.as_deref(), Some(".example.com"));
        assert!(!opts.secure);
        assert!(opts.http_only);
        assert_eq!(opts.same_site, SameSite::Strict);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let cfg = Config::from_lookup(lookup(&with(&[("JWT_SESSION_KEY", "pem-material")])))
            .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("cookie-secret"));
        assert!(!rendered.contains("pem-material"));
        assert!(!rendered.contains("\"secret\""));
    }
}
