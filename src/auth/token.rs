use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ConfigError, MIN_JWT_SECRET_BYTES};

/// Claim name older tokens used for the subject (a .NET `ClaimTypes` URI).
pub const LEGACY_NAME_IDENTIFIER_CLAIM: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";

/// Claim name used by some older tokens for the subject.
pub const LEGACY_USER_ID_CLAIM: &str = "userId";

/// Identity encoded into a freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub id: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
}

/// Claims written into every new token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Fails when `now + ttl` is not a representable timestamp.
    pub fn new(identity: &TokenIdentity, ttl: Duration) -> Result<Self, TokenIssueError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or(TokenIssueError::ExpiryOutOfRange)?;
        Ok(Self {
            sub: identity.id.clone(),
            email: identity.email.clone(),
            firstname: identity.firstname.clone(),
            lastname: identity.lastname.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        })
    }
}

/// Claims as read back during validation. Everything except `exp` is optional
/// so that tokens from older releases still decode.
#[derive(Debug, Deserialize)]
struct PresentedClaims {
    exp: i64,
    #[serde(default)]
    sub: Option<Value>,
    // Compatibility shim: subject claim names used by older token formats.
    // New tokens only ever carry `sub`.
    #[serde(default, rename = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier")]
    legacy_name_identifier: Option<Value>,
    #[serde(default, rename = "userId")]
    legacy_user_id: Option<Value>,
}

impl PresentedClaims {
    fn subject(self) -> Option<String> {
        [self.sub, self.legacy_name_identifier, self.legacy_user_id]
            .into_iter()
            .flatten()
            .filter_map(subject_text)
            .find(|s| !s.trim().is_empty())
    }
}

// Older issuers wrote numeric ids as JSON numbers.
fn subject_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Why a presented token was not accepted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("missing subject")]
    MissingSubject,
}

impl AuthError {
    /// Short machine-checkable reason string.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Malformed => "malformed token",
            AuthError::BadSignature => "invalid signature",
            AuthError::Expired => "token expired",
            AuthError::MissingSubject => "missing subject",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => AuthError::BadSignature,
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Malformed,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenIssueError {
    #[error("JWT generation error: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Token expiry is outside the representable time range")]
    ExpiryOutOfRange,
}

/// Issues and validates HS256 identity tokens.
///
/// Holds only derived key material, so it is cheap to clone and safe to share
/// across request handlers.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// Derive signing keys from `secret`. Secrets shorter than
    /// [`MIN_JWT_SECRET_BYTES`] are a configuration defect.
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::WeakJwtSecret {
                min: MIN_JWT_SECRET_BYTES,
                actual: secret.len(),
            });
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn issue(&self, identity: &TokenIdentity, ttl: Duration) -> Result<String, TokenIssueError> {
        let claims = Claims::new(identity, ttl)?;
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify signature and expiry, then extract the subject id.
    ///
    /// The signature is checked first, so a forged token reports
    /// `BadSignature` even when its `exp` has also passed.
    pub fn validate(&self, token: &str) -> Result<String, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared below with a strict `exp > now`; the library check
        // accepts `exp == now`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<PresentedClaims>(token, &self.decoding_key, &validation)?;

        if data.claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        data.claims.subject().ok_or(AuthError::MissingSubject)
    }
}
