//! Signing key resolution.
//!
//! The key comes from exactly one source: an inline value or a file path.
//! RS256 expects an RSA private key in PEM form (PKCS#1 or PKCS#8); the
//! verification key is derived from it. HS256 takes the raw secret bytes.

use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::DecodePrivateKey;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::SessionError;
use super::codec::{ExpiryPolicy, Hs256Strategy, Rs256Strategy, SigningStrategy};

/// Lifetime applied to HS256 sessions that carry no expiry.
pub const HS256_DEFAULT_LIFETIME: Duration = Duration::from_secs(6 * 3600);

/// Signing algorithm for session tokens. One per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    #[default]
    Rs256,
    Hs256,
}

impl SigningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::Rs256 => "RS256",
            SigningAlgorithm::Hs256 => "HS256",
        }
    }

    /// RS256 sessions must carry their own expiry; HS256 sessions get six hours.
    pub fn default_expiry_policy(&self) -> ExpiryPolicy {
        match self {
            SigningAlgorithm::Rs256 => ExpiryPolicy::Required,
            SigningAlgorithm::Hs256 => ExpiryPolicy::DefaultLifetime(HS256_DEFAULT_LIFETIME),
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RS256" => Ok(SigningAlgorithm::Rs256),
            "HS256" => Ok(SigningAlgorithm::Hs256),
            other => Err(format!("unsupported signing algorithm: {other}")),
        }
    }
}

/// Where the key material lives.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    Inline(String),
    File(PathBuf),
}

// Inline key material must not end up in logs.
impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Inline(_) => f.write_str("Inline(<redacted>)"),
            KeySource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl KeySource {
    /// Pick the single configured source. Empty strings count as unset.
    pub fn from_options(key: Option<&str>, key_file: Option<&Path>) -> Result<Self, SessionError> {
        let key = key.filter(|k| !k.is_empty());
        let key_file = key_file.filter(|p| !p.as_os_str().is_empty());

        match (key, key_file) {
            (Some(_), Some(_)) => Err(SessionError::Configuration(
                "cannot set both jwt-session-key and jwt-session-key-file options".into(),
            )),
            (None, None) => Err(SessionError::Configuration(
                "jwt session store requires a key for signing tokens".into(),
            )),
            (Some(key), None) => Ok(KeySource::Inline(key.to_string())),
            (None, Some(path)) => Ok(KeySource::File(path.to_path_buf())),
        }
    }

    fn read(&self) -> Result<Vec<u8>, SessionError> {
        match self {
            KeySource::Inline(key) => Ok(key.as_bytes().to_vec()),
            KeySource::File(path) => std::fs::read(path).map_err(|e| {
                SessionError::Configuration(format!(
                    "cannot read session key file {}: {e}",
                    path.display()
                ))
            }),
        }
    }
}

/// Key options as they arrive from configuration.
#[derive(Clone, Default)]
pub struct JwtKeyOptions {
    pub key: Option<String>,
    pub key_file: Option<PathBuf>,
    pub algorithm: SigningAlgorithm,
}

impl std::fmt::Debug for JwtKeyOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeyOptions")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Resolve and parse the configured key into a signing strategy.
pub fn load_signing_strategy(
    opts: &JwtKeyOptions,
) -> Result<Box<dyn SigningStrategy>, SessionError> {
    let source = KeySource::from_options(opts.key.as_deref(), opts.key_file.as_deref())?;
    let material = source.read()?;

    match opts.algorithm {
        SigningAlgorithm::Rs256 => {
            let pem = std::str::from_utf8(&material)
                .map_err(|_| SessionError::KeyFormat("RSA key is not valid UTF-8 PEM".into()))?;
            rs256_from_pem(pem).map(|s| Box::new(s) as Box<dyn SigningStrategy>)
        }
        SigningAlgorithm::Hs256 => {
            hs256_from_secret(&material).map(|s| Box::new(s) as Box<dyn SigningStrategy>)
        }
    }
}

fn rs256_from_pem(pem: &str) -> Result<Rs256Strategy, SessionError> {
    let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| {
            SessionError::KeyFormat(format!("expected an RSA private key in PEM format: {e}"))
        })?;

    // ring wants PKCS#1 DER on both sides, whatever the PEM flavour was.
    let private_der = private_key
        .to_pkcs1_der()
        .map_err(|e| SessionError::KeyFormat(e.to_string()))?;
    let public_der = private_key
        .to_public_key()
        .to_pkcs1_der()
        .map_err(|e| SessionError::KeyFormat(e.to_string()))?;

    Ok(Rs256Strategy::new(
        EncodingKey::from_rsa_der(private_der.as_bytes()),
        DecodingKey::from_rsa_der(public_der.as_bytes()),
    ))
}

fn hs256_from_secret(material: &[u8]) -> Result<Hs256Strategy, SessionError> {
    let secret = material.trim_ascii_end();
    if secret.is_empty() {
        return Err(SessionError::KeyFormat("HS256 secret is empty".into()));
    }
    Ok(Hs256Strategy::new(
        EncodingKey::from_secret(secret),
        DecodingKey::from_secret(secret),
    ))
}
