//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use dryfruit_core::{OrderId, PaymentMethod};

use super::{ApiResponse, JsonBody};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderDetail, ShippingInfo};
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Checkout body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_info: ShippingInfo,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
}

const fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Cod
}

/// Status change body. The value is validated by the service.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// POST /api/orders
#[instrument(skip(state, user, request), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(request): JsonBody<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>)> {
    add_breadcrumb("checkout", "Place order", None);
    let order = OrderService::new(state.store())
        .create_order(&user.caller(), &request.shipping_info, request.payment_method)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(order)))
}

/// GET /api/orders
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let orders = OrderService::new(state.store())
        .list_all_orders(&user.caller())
        .await?;
    Ok(ApiResponse::ok(orders))
}

/// GET /api/orders/myorders
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let orders = OrderService::new(state.store())
        .list_my_orders(&user.caller())
        .await?;
    Ok(ApiResponse::ok(orders))
}

/// GET /api/orders/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<OrderDetail>>> {
    let order = OrderService::new(state.store())
        .get_order(&user.caller(), id)
        .await?;
    Ok(ApiResponse::ok(order))
}

/// PUT /api/orders/{id} and PUT /api/users/delivery/orders/{id}
#[instrument(skip(state, user, request), fields(user_id = %user.id, status = %request.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    JsonBody(request): JsonBody<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = OrderService::new(state.store())
        .update_status(&user.caller(), id, &request.status)
        .await?;
    Ok(ApiResponse::ok(order))
}

/// PUT /api/orders/{id}/deliver
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn deliver(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = OrderService::new(state.store())
        .mark_delivered(&user.caller(), id)
        .await?;
    Ok(ApiResponse::ok(order))
}
