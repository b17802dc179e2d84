//! Site visit counter.

use axum::{Json, extract::State};
use serde::Serialize;

use super::ApiResponse;
use crate::error::Result;
use crate::services::visitors::{record_visit, visitor_count};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VisitorCount {
    pub count: i64,
}

/// POST /api/visitors
pub async fn record(State(state): State<AppState>) -> Result<Json<ApiResponse<VisitorCount>>> {
    let count = record_visit(state.store()).await?;
    Ok(ApiResponse::ok(VisitorCount { count }))
}

/// GET /api/visitors/count
pub async fn count(State(state): State<AppState>) -> Result<Json<ApiResponse<VisitorCount>>> {
    let count = visitor_count(state.store()).await?;
    Ok(ApiResponse::ok(VisitorCount { count }))
}
