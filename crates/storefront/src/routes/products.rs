//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use dryfruit_core::{ImageId, ProductId};

use super::{ApiMessage, ApiPage, ApiResponse, JsonBody};
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{NewProductImage, Product, ProductImage, ProductPage, ProductPatch};
use crate::services::catalog::{CatalogService, ProductInput, ProductQuery};
use crate::state::AppState;

/// Image upload body.
#[derive(Debug, Deserialize)]
pub struct AddImagesRequest {
    pub images: Vec<NewProductImage>,
}

/// GET /api/products
#[instrument(skip(state, user, query))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiPage<ProductPage>>> {
    let caller = user.map(|u| u.caller());
    let page = CatalogService::new(state.store())
        .list_products(caller.as_ref(), query)
        .await?;
    Ok(ApiPage::ok(page))
}

/// GET /api/products/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = CatalogService::new(state.store()).get_product(id).await?;
    Ok(ApiResponse::ok(product))
}

/// GET /api/products/slug/{slug}
pub async fn show_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = CatalogService::new(state.store())
        .get_product_by_slug(&slug)
        .await?;
    Ok(ApiResponse::ok(product))
}

/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>)> {
    let product = CatalogService::new(state.store())
        .create_product(&user.caller(), input)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(product)))
}

/// PUT /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    JsonBody(patch): JsonBody<ProductPatch>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = CatalogService::new(state.store())
        .update_product(&user.caller(), id, patch)
        .await?;
    Ok(ApiResponse::ok(product))
}

/// DELETE /api/products/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<ApiMessage>> {
    CatalogService::new(state.store())
        .delete_product(&user.caller(), id)
        .await?;
    Ok(ApiMessage::ok("Product removed"))
}

/// POST /api/products/{id}/images
pub async fn add_images(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    JsonBody(request): JsonBody<AddImagesRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = CatalogService::new(state.store())
        .add_product_images(&user.caller(), id, request.images)
        .await?;
    Ok(ApiResponse::ok(product))
}

/// DELETE /api/products/{id}/images/{image_id}
pub async fn delete_image(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((id, image_id)): Path<(ProductId, ImageId)>,
) -> Result<Json<ApiResponse<ProductImage>>> {
    let image = CatalogService::new(state.store())
        .delete_product_image(&user.caller(), id, image_id)
        .await?;
    Ok(ApiResponse::ok(image))
}
