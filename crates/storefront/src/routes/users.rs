//! User administration, favorites, and the delivery queue.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dryfruit_core::{ProductId, UserId};

use super::{ApiResponse, JsonBody};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Order, ProductSummary, User};
use crate::services::accounts::AccountService;
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Role change body.
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// Result of toggling a favorite.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteToggled {
    pub product_id: ProductId,
    pub is_favorite: bool,
}

/// GET /api/users
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Vec<User>>>> {
    let users = AccountService::new(state.store())
        .list_users(&user.caller())
        .await?;
    Ok(ApiResponse::ok(users))
}

/// PUT /api/users/{id}/role
#[instrument(skip(state, user, request), fields(admin_id = %user.id))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<UserId>,
    JsonBody(request): JsonBody<SetRoleRequest>,
) -> Result<Json<ApiResponse<User>>> {
    let updated = AccountService::new(state.store())
        .set_role(&user.caller(), id, &request.role)
        .await?;
    Ok(ApiResponse::ok(updated))
}

/// GET /api/users/favorites
pub async fn favorites(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Vec<ProductSummary>>>> {
    let products = AccountService::new(state.store())
        .favorites(&user.caller())
        .await?;
    Ok(ApiResponse::ok(products))
}

/// POST /api/users/favorites/{product_id}
pub async fn toggle_favorite(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ApiResponse<FavoriteToggled>>> {
    let is_favorite = AccountService::new(state.store())
        .toggle_favorite(&user.caller(), product_id)
        .await?;
    Ok(ApiResponse::ok(FavoriteToggled {
        product_id,
        is_favorite,
    }))
}

/// GET /api/users/delivery/orders
pub async fn delivery_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let orders = OrderService::new(state.store())
        .list_delivery_orders(&user.caller())
        .await?;
    Ok(ApiResponse::ok(orders))
}
