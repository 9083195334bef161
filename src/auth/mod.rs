pub mod password;
pub mod token;

pub use password::{Argon2Verifier, CredentialVerifier, HashError};
pub use token::{AuthError, Claims, TokenCodec, TokenIdentity, TokenIssueError};
