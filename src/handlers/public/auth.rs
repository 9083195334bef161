// handlers/public/auth.rs - POST /api/register and POST /api/login

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::{AuthSession, LoginRequest, RegisterRequest};
use crate::state::AppState;

/// POST /api/register - Create an account and receive a token
///
/// Expected Input:
/// ```json
/// {
///   "email": "ada@example.com",
///   "password": "secret1",
///   "confirm_password": "secret1",
///   "firstname": "Ada",
///   "lastname": "Lovelace"
/// }
/// ```
///
/// Responds 201 with `{token, user}`, 400 with `field_errors` on invalid
/// input, 409 when the email is already registered.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<AuthSession> {
    let Json(request) = payload.map_err(ApiError::from)?;
    let session = state.auth.register(request).await?;
    Ok(ApiResponse::created(session))
}

/// POST /api/login - Exchange email and password for a token
///
/// Unknown email and wrong password both answer 401
/// "Invalid email or password.".
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<AuthSession> {
    let Json(request) = payload.map_err(ApiError::from)?;
    let session = state.auth.login(request).await?;
    Ok(ApiResponse::success(session))
}
