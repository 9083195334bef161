use axum::{extract::State, Extension};

use crate::database::models::UserProfile;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/auth/whoami - Profile of the caller identified by the token
pub async fn whoami(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<UserProfile> {
    let profile = state.auth.profile(user.user_id()?).await?;
    Ok(ApiResponse::success(profile))
}
