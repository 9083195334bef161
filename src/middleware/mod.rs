pub mod auth;
pub mod response;

pub use auth::{authorize, extract_bearer, jwt_auth_middleware, AuthOutcome, AuthUser, RejectReason};
pub use response::{ApiResponse, ApiResult};
