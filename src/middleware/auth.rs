use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::auth::{AuthError, TokenCodec};
use crate::error::ApiError;
use crate::state::AppState;

/// Why a request was turned away at the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingCredential,
    BadFormat,
    EmptyToken,
    Token(AuthError),
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingCredential => "missing credential",
            RejectReason::BadFormat => "bad format",
            RejectReason::EmptyToken => "empty token",
            RejectReason::Token(e) => e.reason(),
        }
    }
}

/// Result of inspecting one request's credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized { subject_id: String },
    Rejected { reason: RejectReason },
}

/// Authenticated caller, inserted into request extensions by the gate.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub subject_id: String,
}

impl AuthUser {
    /// Numeric user id carried by the subject claim.
    pub fn user_id(&self) -> Result<i32, ApiError> {
        self.subject_id
            .parse()
            .map_err(|_| ApiError::unauthorized("unknown subject"))
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` value. The scheme
/// is matched case-insensitively and surrounding whitespace on the token is
/// dropped.
pub fn extract_bearer(header: &HeaderValue) -> Result<&str, RejectReason> {
    let value = header.to_str().map_err(|_| RejectReason::BadFormat)?;
    let (scheme, token) = match value.split_once(' ') {
        Some(parts) => parts,
        // "Bearer" with nothing after it
        None if value.eq_ignore_ascii_case("bearer") => return Err(RejectReason::EmptyToken),
        None => return Err(RejectReason::BadFormat),
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(RejectReason::BadFormat);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(RejectReason::EmptyToken);
    }
    Ok(token)
}

/// Decide a request's outcome from its `Authorization` header.
pub fn authorize(header: Option<&HeaderValue>, codec: &TokenCodec) -> AuthOutcome {
    let header = match header {
        Some(h) => h,
        None => {
            return AuthOutcome::Rejected {
                reason: RejectReason::MissingCredential,
            }
        }
    };

    let token = match extract_bearer(header) {
        Ok(token) => token,
        Err(reason) => return AuthOutcome::Rejected { reason },
    };

    match codec.validate(token) {
        Ok(subject_id) => AuthOutcome::Authorized { subject_id },
        Err(e) => AuthOutcome::Rejected {
            reason: RejectReason::Token(e),
        },
    }
}

/// JWT authentication middleware for `/api/*` routes
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authorize(request.headers().get(AUTHORIZATION), &state.tokens) {
        AuthOutcome::Authorized { subject_id } => {
            request.extensions_mut().insert(AuthUser { subject_id });
            next.run(request).await
        }
        AuthOutcome::Rejected { reason } => {
            debug!("Rejected {} {}: {}", request.method(), request.uri().path(), reason.as_str());
            ApiError::unauthorized(reason.as_str()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenIdentity;
    use crate::testing::TEST_SECRET;
    use chrono::Duration;

    fn codec() -> TokenCodec {
        TokenCodec::new(TEST_SECRET).unwrap()
    }

    fn token(ttl: Duration) -> String {
        let identity = TokenIdentity {
            id: "17".to_string(),
            email: "ada@example.com".to_string(),
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
        };
        codec().issue(&identity, ttl).unwrap()
    }

    fn rejected(header: Option<&str>) -> RejectReason {
        let value = header.map(|h| HeaderValue::from_str(h).unwrap());
        match authorize(value.as_ref(), &codec()) {
            AuthOutcome::Rejected { reason } => reason,
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn valid_token_is_authorized() {
        let header = HeaderValue::from_str(&format!("Bearer {}", token(Duration::hours(1)))).unwrap();
        assert_eq!(
            authorize(Some(&header), &codec()),
            AuthOutcome::Authorized {
                subject_id: "17".to_string()
            }
        );
    }

    #[test]
    fn scheme_is_case_insensitive_and_token_trimmed() {
        let header = HeaderValue::from_str(&format!("bEaReR   {}  ", token(Duration::hours(1)))).unwrap();
        assert!(matches!(
            authorize(Some(&header), &codec()),
            AuthOutcome::Authorized { .. }
        ));
    }

    #[test]
    fn missing_header() {
        assert_eq!(rejected(None), RejectReason::MissingCredential);
        assert_eq!(rejected(None).as_str(), "missing credential");
    }

    #[test]
    fn wrong_scheme_or_shape_is_bad_format() {
        assert_eq!(rejected(Some("Token abc")), RejectReason::BadFormat);
        assert_eq!(rejected(Some("Basic dXNlcjpwYXNz")), RejectReason::BadFormat);
        assert_eq!(rejected(Some("abc.def.ghi")), RejectReason::BadFormat);
    }

    #[test]
    fn non_ascii_header_is_bad_format() {
        let header = HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap();
        assert_eq!(
            authorize(Some(&header), &codec()),
            AuthOutcome::Rejected {
                reason: RejectReason::BadFormat
            }
        );
    }

    #[test]
    fn blank_token_is_empty() {
        assert_eq!(rejected(Some("Bearer")), RejectReason::EmptyToken);
        assert_eq!(rejected(Some("Bearer    ")), RejectReason::EmptyToken);
        assert_eq!(rejected(Some("Bearer ")).as_str(), "empty token");
    }

    #[test]
    fn token_failures_carry_codec_reason() {
        assert_eq!(rejected(Some("Bearer not-a-jwt")).as_str(), "malformed token");

        let expired = format!("Bearer {}", token(Duration::seconds(-30)));
        assert_eq!(rejected(Some(&expired)).as_str(), "token expired");

        let forged = TokenCodec::new("another-secret-that-is-long-enough!!")
            .unwrap()
            .issue(
                &TokenIdentity {
                    id: "1".to_string(),
                    email: "x@example.com".to_string(),
                    firstname: "X".to_string(),
                    lastname: "Y".to_string(),
                },
                Duration::hours(1),
            )
            .unwrap();
        assert_eq!(
            rejected(Some(&format!("Bearer {}", forged))).as_str(),
            "invalid signature"
        );
    }

    #[test]
    fn non_numeric_subject_is_unauthorized() {
        let user = AuthUser {
            subject_id: "abc".to_string(),
        };
        assert_eq!(user.user_id().unwrap_err().status_code(), 401);
        let user = AuthUser {
            subject_id: "12".to_string(),
        };
        assert_eq!(user.user_id().unwrap(), 12);
    }
}
