//! Session ⇄ JWT codec.
//!
//! Claims use short names (`uid`, `cn`, `mail`, ...) alongside `nbf`
//! (creation) and `exp` (expiry). Tokens carry `kid: "secret"` in the header.
//! Empty lists are written as `null` and `null` lists read back as empty.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{SessionError, SessionState, from_unix_seconds, unix_seconds};

/// Key id written into every token header.
pub const TOKEN_KEY_ID: &str = "secret";

/// JWT claims carried in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub nbf: u64,
    pub exp: u64,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub cn: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub mail: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub groups: Option<Vec<String>>,
    #[serde(default)]
    pub tenants: Option<Vec<String>>,
}

impl Claims {
    fn from_session(session: &SessionState, nbf: u64, exp: u64) -> Self {
        Self {
            nbf,
            exp,
            uid: session.user.clone(),
            cn: session.preferred_username.clone(),
            username: session.username.clone(),
            mail: session.email.clone(),
            tenant: session.tenant.clone(),
            groups: non_empty(&session.groups),
            tenants: non_empty(&session.tenants),
        }
    }

    fn into_session(self) -> SessionState {
        SessionState {
            user: self.uid,
            preferred_username: self.cn,
            username: self.username,
            email: self.mail,
            tenant: self.tenant,
            groups: self.groups.unwrap_or_default(),
            tenants: self.tenants.unwrap_or_default(),
            access_token: String::new(),
            created_at: Some(from_unix_seconds(self.nbf)),
            expires_on: Some(from_unix_seconds(self.exp)),
        }
    }
}

fn non_empty(list: &[String]) -> Option<Vec<String>> {
    (!list.is_empty()).then(|| list.to_vec())
}

/// Signs and verifies tokens with one algorithm and one key.
pub trait SigningStrategy: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    fn sign(&self, header: &Header, claims: &Claims) -> jsonwebtoken::errors::Result<String>;

    fn verify(&self, token: &str, validation: &Validation) -> jsonwebtoken::errors::Result<Claims>;
}

/// RSA private key for signing, matching public key for verification.
pub struct Rs256Strategy {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Rs256Strategy {
    pub(crate) fn new(encoding: EncodingKey, decoding: DecodingKey) -> Self {
        Self { encoding, decoding }
    }
}

impl SigningStrategy for Rs256Strategy {
    fn algorithm(&self) -> Algorithm {
        Algorithm::RS256
    }

    fn sign(&self, header: &Header, claims: &Claims) -> jsonwebtoken::errors::Result<String> {
        jsonwebtoken::encode(header, claims, &self.encoding)
    }

    fn verify(&self, token: &str, validation: &Validation) -> jsonwebtoken::errors::Result<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, validation).map(|data| data.claims)
    }
}

/// One shared secret for both directions.
pub struct Hs256Strategy {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256Strategy {
    pub(crate) fn new(encoding: EncodingKey, decoding: DecodingKey) -> Self {
        Self { encoding, decoding }
    }
}

impl SigningStrategy for Hs256Strategy {
    fn algorithm(&self) -> Algorithm {
        Algorithm::HS256
    }

    fn sign(&self, header: &Header, claims: &Claims) -> jsonwebtoken::errors::Result<String> {
        jsonwebtoken::encode(header, claims, &self.encoding)
    }

    fn verify(&self, token: &str, validation: &Validation) -> jsonwebtoken::errors::Result<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, validation).map(|data| data.claims)
    }
}

/// What to do with a session that has no expiry at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Refuse to encode it.
    Required,
    /// Expire it this long after creation.
    DefaultLifetime(Duration),
}

/// Encodes sessions into signed tokens and back.
pub struct SessionCodec {
    strategy: Box<dyn SigningStrategy>,
    expiry_policy: ExpiryPolicy,
}

impl SessionCodec {
    pub fn new(strategy: Box<dyn SigningStrategy>, expiry_policy: ExpiryPolicy) -> Self {
        Self {
            strategy,
            expiry_policy,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.strategy.algorithm()
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry_policy
    }

    /// Sign `session` into a compact token.
    ///
    /// Stamps `created_at` when unset (or at the epoch) and, under
    /// [`ExpiryPolicy::DefaultLifetime`], fills in `expires_on`. Both changes
    /// are written back into `session`.
    pub fn encode(&self, session: &mut SessionState) -> Result<String, SessionError> {
        let created_at = match session.created_at {
            Some(t) if t != UNIX_EPOCH => t,
            _ => {
                let now = SystemTime::now();
                session.created_at = Some(now);
                now
            }
        };

        let expires_on = match (session.expires_on, self.expiry_policy) {
            (Some(exp), _) => exp,
            (None, ExpiryPolicy::DefaultLifetime(lifetime)) => {
                let exp = created_at.checked_add(lifetime).ok_or_else(|| {
                    SessionError::InvalidSession(format!(
                        "session lifetime {}s is out of range",
                        lifetime.as_secs()
                    ))
                })?;
                session.expires_on = Some(exp);
                exp
            }
            (None, ExpiryPolicy::Required) => {
                return Err(SessionError::InvalidSession(
                    "session has no expiry".into(),
                ));
            }
        };

        let nbf = unix_seconds(created_at);
        let exp = unix_seconds(expires_on);
        if exp <= nbf {
            return Err(SessionError::InvalidSession(format!(
                "expiry {exp} is not after creation {nbf}"
            )));
        }

        let mut header = Header::new(self.strategy.algorithm());
        header.kid = Some(TOKEN_KEY_ID.to_string());

        self.strategy
            .sign(&header, &Claims::from_session(session, nbf, exp))
            .map_err(|e| SessionError::InvalidSession(format!("failed to sign session: {e}")))
    }

    /// Verify `token` and rebuild the session it carries.
    pub fn decode(&self, token: &str) -> Result<SessionState, SessionError> {
        let claims = self
            .strategy
            .verify(token, &self.validation())
            .map_err(|e| SessionError::InvalidToken(e.to_string()))?;

        if unix_seconds(SystemTime::now()) >= claims.exp {
            return Err(SessionError::ExpiredToken);
        }

        Ok(claims.into_session())
    }

    // Expiry is checked by hand after verification so that an expired but
    // well-signed token reports ExpiredToken, and so expiry is inclusive.
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.strategy.algorithm());
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf"]);
        validation
    }
}
