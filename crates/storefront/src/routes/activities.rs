//! Activity feed for the admin dashboard.

use axum::{Json, extract::State};

use super::ApiResponse;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Activity;
use crate::services::activity;
use crate::state::AppState;

/// GET /api/activities
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Vec<Activity>>>> {
    let entries = activity::latest(state.store(), &user.caller()).await?;
    Ok(ApiResponse::ok(entries))
}
