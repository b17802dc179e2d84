//! Account route handlers: registration, login, and profile.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{ApiMessage, ApiResponse, JsonBody};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, ProfileUpdate, User};
use crate::services::accounts::AccountService;
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password change request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| session_error(&e))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// POST /api/auth/register
#[instrument(skip(state, session, registration))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    JsonBody(registration): JsonBody<Registration>,
) -> Result<(StatusCode, Json<ApiResponse<User>>)> {
    let user = AuthService::new(state.store())
        .register(&registration)
        .await?;
    start_session(&session, &user).await?;

    Ok((StatusCode::CREATED, ApiResponse::ok(user)))
}

/// POST /api/auth/login
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<ApiResponse<User>>> {
    let user = AuthService::new(state.store())
        .login(&request.email, &request.password)
        .await?;
    start_session(&session, &user).await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(ApiResponse::ok(user))
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> Result<Json<ApiMessage>> {
    clear_current_user(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();
    Ok(ApiMessage::ok("Logged out"))
}

/// GET /api/auth/profile
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<User>>> {
    let profile = AccountService::new(state.store())
        .profile(&user.caller())
        .await?;
    Ok(ApiResponse::ok(profile))
}

/// PUT /api/auth/profile
#[instrument(skip(state, user, update), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<ApiResponse<User>>> {
    let profile = AccountService::new(state.store())
        .update_profile(&user.caller(), update)
        .await?;
    Ok(ApiResponse::ok(profile))
}

/// PUT /api/auth/password
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(request): JsonBody<ChangePasswordRequest>,
) -> Result<Json<ApiMessage>> {
    AuthService::new(state.store())
        .change_password(user.id, &request.current_password, &request.new_password)
        .await?;
    Ok(ApiMessage::ok("Password updated"))
}

/// DELETE /api/auth/account
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiMessage>> {
    AuthService::new(state.store())
        .delete_account(user.id)
        .await?;
    clear_current_user(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();
    Ok(ApiMessage::ok("Account deleted"))
}
