// services/auth_service.rs - Registration, login and profile lookup
//
// Orchestrates validation, the credential store, the password verifier and the
// token codec. Storage and hashing sit behind traits so the flow can run
// against in-memory fakes.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{CredentialVerifier, HashError, TokenCodec, TokenIssueError};
use crate::database::models::{NewUser, User, UserProfile};
use crate::database::DatabaseError;
use crate::services::{field_errors, not_blank};

/// Persistence for user accounts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user. A duplicate email surfaces as `DatabaseError::Conflict`.
    async fn create(&self, new_user: NewUser) -> Result<User, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, DatabaseError>;
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Email is not valid."))]
    pub email: String,

    #[validate(
        length(min = 6, message = "Password must be at least 6 characters."),
        custom(function = "not_blank", message = "Password cannot be empty.")
    )]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub confirm_password: String,

    #[validate(custom(function = "not_blank", message = "Firstname cannot be empty."))]
    pub firstname: String,

    #[validate(custom(function = "not_blank", message = "Lastname cannot be empty."))]
    pub lastname: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email is not valid."))]
    pub email: String,

    #[validate(custom(function = "not_blank", message = "Password cannot be empty."))]
    pub password: String,
}

/// A freshly issued token together with the user it identifies.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("Validation failed")]
    Validation(HashMap<String, String>),

    #[error("Email already exists.")]
    EmailTaken,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("User not found.")]
    UnknownUser,

    #[error(transparent)]
    Hashing(#[from] HashError),

    #[error(transparent)]
    Token(#[from] TokenIssueError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    verifier: Arc<dyn CredentialVerifier>,
    tokens: TokenCodec,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        verifier: Arc<dyn CredentialVerifier>,
        tokens: TokenCodec,
        token_ttl: Duration,
    ) -> Self {
        Self {
            credentials,
            verifier,
            tokens,
            token_ttl,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession, AuthServiceError> {
        request
            .validate()
            .map_err(|e| AuthServiceError::Validation(field_errors(&e)))?;

        if self.credentials.find_by_email(&request.email).await?.is_some() {
            return Err(AuthServiceError::EmailTaken);
        }

        let password_digest = self.hash(request.password).await?;
        let user = self
            .credentials
            .create(NewUser {
                email: request.email,
                firstname: request.firstname,
                lastname: request.lastname,
                password_digest,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                DatabaseError::Conflict(_) => AuthServiceError::EmailTaken,
                other => AuthServiceError::Database(other),
            })?;

        info!("Registered user {}", user.id);
        self.session_for(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession, AuthServiceError> {
        request
            .validate()
            .map_err(|e| AuthServiceError::Validation(field_errors(&e)))?;

        let user = match self.credentials.find_by_email(&request.email).await? {
            Some(user) => user,
            None => {
                warn!("Login attempt for unknown email");
                return Err(AuthServiceError::InvalidCredentials);
            }
        };

        if !self.verify(request.password, user.password.clone()).await {
            warn!("Login attempt with wrong password for user {}", user.id);
            return Err(AuthServiceError::InvalidCredentials);
        }

        info!("User {} logged in", user.id);
        self.session_for(user)
    }

    pub async fn profile(&self, user_id: i32) -> Result<UserProfile, AuthServiceError> {
        self.credentials
            .find_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or(AuthServiceError::UnknownUser)
    }

    fn session_for(&self, user: User) -> Result<AuthSession, AuthServiceError> {
        let token = self.tokens.issue(&user.identity(), self.token_ttl)?;
        Ok(AuthSession {
            token,
            user: user.into(),
        })
    }

    // Argon2 blocks for tens of milliseconds; run it on the blocking pool.
    async fn hash(&self, plaintext: String) -> Result<String, AuthServiceError> {
        let verifier = Arc::clone(&self.verifier);
        let digest = tokio::task::spawn_blocking(move || verifier.hash(&plaintext))
            .await
            .map_err(|e| HashError::new(e.to_string()))??;
        Ok(digest)
    }

    async fn verify(&self, plaintext: String, digest: String) -> bool {
        let verifier = Arc::clone(&self.verifier);
        tokio::task::spawn_blocking(move || verifier.verify(&plaintext, &digest))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Argon2Verifier;
    use crate::testing::{MemoryCredentialStore, TEST_SECRET};

    fn service() -> (AuthService, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::default());
        let service = AuthService::new(
            store.clone(),
            Arc::new(Argon2Verifier),
            TokenCodec::new(TEST_SECRET).unwrap(),
            Duration::hours(1),
        );
        (service, store)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "hunter22".to_string(),
            confirm_password: "hunter22".to_string(),
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_issues_token_for_new_user() {
        let (service, store) = service();
        let session = service.register(register_request("ada@example.com")).await.unwrap();

        assert_eq!(session.user.email, "ada@example.com");
        assert_eq!(store.len(), 1);

        let codec = TokenCodec::new(TEST_SECRET).unwrap();
        assert_eq!(codec.validate(&session.token).unwrap(), session.user.id.to_string());
    }

    #[tokio::test]
    async fn register_stores_digest_not_plaintext() {
        let (service, store) = service();
        service.register(register_request("ada@example.com")).await.unwrap();

        let stored = store.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password, "hunter22");
        assert!(stored.password.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let (service, store) = service();
        service.register(register_request("ada@example.com")).await.unwrap();

        let err = service.register(register_request("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::EmailTaken));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn register_reports_each_invalid_field() {
        let (service, _) = service();
        let mut request = register_request("not-an-email");
        request.password = "abc".to_string();
        request.confirm_password = "xyz".to_string();
        request.lastname = String::new();

        match service.register(request).await.unwrap_err() {
            AuthServiceError::Validation(fields) => {
                assert_eq!(fields["email"], "Email is not valid.");
                assert_eq!(fields["password"], "Password must be at least 6 characters.");
                assert_eq!(fields["confirm_password"], "Passwords do not match.");
                assert_eq!(fields["lastname"], "Lastname cannot be empty.");
                assert!(!fields.contains_key("firstname"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn login_with_correct_password() {
        let (service, _) = service();
        let registered = service.register(register_request("ada@example.com")).await.unwrap();

        let session = service
            .login(login_request("ada@example.com", "hunter22"))
            .await
            .unwrap();
        assert_eq!(session.user, registered.user);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_email_alike() {
        let (service, _) = service();
        service.register(register_request("ada@example.com")).await.unwrap();

        let wrong = service
            .login(login_request("ada@example.com", "wrong-password"))
            .await
            .unwrap_err();
        let unknown = service
            .login(login_request("bob@example.com", "hunter22"))
            .await
            .unwrap_err();

        assert!(matches!(wrong, AuthServiceError::InvalidCredentials));
        assert!(matches!(unknown, AuthServiceError::InvalidCredentials));
        assert_eq!(wrong.to_string(), "Invalid email or password.");
    }

    #[tokio::test]
    async fn login_requires_password() {
        let (service, _) = service();
        match service.login(login_request("ada@example.com", "")).await.unwrap_err() {
            AuthServiceError::Validation(fields) => {
                assert_eq!(fields["password"], "Password cannot be empty.");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn whitespace_only_fields_are_rejected() {
        let (service, store) = service();
        let mut request = register_request("ada@example.com");
        request.password = "      ".to_string();
        request.confirm_password = "      ".to_string();
        request.firstname = "  ".to_string();
        request.lastname = "\t".to_string();

        match service.register(request).await.unwrap_err() {
            AuthServiceError::Validation(fields) => {
                assert_eq!(fields["password"], "Password cannot be empty.");
                assert_eq!(fields["firstname"], "Firstname cannot be empty.");
                assert_eq!(fields["lastname"], "Lastname cannot be empty.");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(store.len(), 0);

        match service.login(login_request("ada@example.com", "   ")).await.unwrap_err() {
            AuthServiceError::Validation(fields) => {
                assert_eq!(fields["password"], "Password cannot be empty.");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn profile_of_unknown_user() {
        let (service, _) = service();
        let err = service.profile(99).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::UnknownUser));
    }
}
