//! Contact form handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use dryfruit_core::ContactId;

use super::{ApiMessage, ApiResponse, JsonBody};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{ContactForm, ContactSubmission};
use crate::services::contact::ContactService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateContactRequest {
    pub status: String,
}

/// POST /api/contact
#[instrument(skip(state, form))]
pub async fn submit(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<ContactForm>,
) -> Result<(StatusCode, Json<ApiMessage>)> {
    ContactService::new(state.pool()).submit(form).await?;
    Ok((
        StatusCode::CREATED,
        ApiMessage::ok("Thanks for reaching out! We'll get back to you soon."),
    ))
}

/// GET /api/contact
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Vec<ContactSubmission>>>> {
    let messages = ContactService::new(state.pool())
        .list(&user.caller())
        .await?;
    Ok(ApiResponse::ok(messages))
}

/// PUT /api/contact/{id}
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ContactId>,
    JsonBody(request): JsonBody<UpdateContactRequest>,
) -> Result<Json<ApiResponse<ContactSubmission>>> {
    let message = ContactService::new(state.pool())
        .update_status(&user.caller(), id, &request.status)
        .await?;
    Ok(ApiResponse::ok(message))
}
