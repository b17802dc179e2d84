//! Cart route handlers.
//!
//! The cart belongs to the logged-in user; every handler requires a session.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use dryfruit_core::{CartItemId, ProductId, VariantId};

use super::{ApiResponse, JsonBody};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::CartView;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Add-to-cart body. `quantity` defaults to 1.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// Quantity update body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// GET /api/cart
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<CartView>>> {
    let cart = CartService::new(state.store())
        .get_cart(&user.caller())
        .await?;
    Ok(ApiResponse::ok(cart))
}

/// POST /api/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(request): JsonBody<AddToCartRequest>,
) -> Result<Json<ApiResponse<CartView>>> {
    add_breadcrumb(
        "cart",
        "Add to cart",
        Some(&[("variant_id", &request.variant_id.to_string())]),
    );
    let cart = CartService::new(state.store())
        .add_to_cart(
            &user.caller(),
            request.product_id,
            request.variant_id,
            request.quantity,
        )
        .await?;
    Ok(ApiResponse::ok(cart))
}

/// PUT /api/cart/{item_id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
    JsonBody(request): JsonBody<UpdateQuantityRequest>,
) -> Result<Json<ApiResponse<CartView>>> {
    let cart = CartService::new(state.store())
        .update_line_quantity(&user.caller(), item_id, request.quantity)
        .await?;
    Ok(ApiResponse::ok(cart))
}

/// DELETE /api/cart/{item_id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<ApiResponse<CartView>>> {
    let cart = CartService::new(state.store())
        .remove_line(&user.caller(), item_id)
        .await?;
    Ok(ApiResponse::ok(cart))
}

/// DELETE /api/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<CartView>>> {
    let cart = CartService::new(state.store())
        .clear_cart(&user.caller())
        .await?;
    Ok(ApiResponse::ok(cart))
}
