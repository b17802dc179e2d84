//! HTTP route handlers for the storefront API.
//!
//! Every response is JSON. Successful responses wrap their payload as
//! `{"success": true, "data": ...}`; errors are rendered by
//! [`AppError`](crate::error::AppError).
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/auth/register          - Create an account and log in
//! POST   /api/auth/login             - Log in
//! POST   /api/auth/logout            - Log out
//! GET    /api/auth/profile           - Current user's profile
//! PUT    /api/auth/profile           - Update profile
//! PUT    /api/auth/password          - Change password
//! DELETE /api/auth/account           - Delete account
//!
//! # Products
//! GET    /api/products               - Filtered, paginated listing
//! POST   /api/products               - Create (admin)
//! GET    /api/products/slug/{slug}   - Detail by slug
//! GET    /api/products/{id}          - Detail
//! PUT    /api/products/{id}          - Update (admin)
//! DELETE /api/products/{id}          - Delete (admin)
//! POST   /api/products/{id}/images   - Attach image metadata (admin)
//! DELETE /api/products/{id}/images/{image_id} - Detach image (admin)
//!
//! # Cart (requires auth)
//! GET    /api/cart                   - Cart with live variant details
//! POST   /api/cart                   - Add a line
//! DELETE /api/cart                   - Clear
//! PUT    /api/cart/{item_id}         - Set a line's quantity
//! DELETE /api/cart/{item_id}         - Remove a line
//!
//! # Orders (requires auth)
//! POST   /api/orders                 - Place an order from the cart
//! GET    /api/orders                 - All orders (admin)
//! GET    /api/orders/myorders        - Caller's orders
//! GET    /api/orders/{id}            - Detail (owner or admin)
//! PUT    /api/orders/{id}            - Change status (admin or delivery)
//! PUT    /api/orders/{id}/deliver    - Mark delivered (admin)
//!
//! # Users (requires auth)
//! GET    /api/users                  - All users (admin)
//! PUT    /api/users/{id}/role        - Change role (admin)
//! GET    /api/users/favorites        - Favorite products
//! POST   /api/users/favorites/{product_id} - Toggle a favorite
//! GET    /api/users/delivery/orders  - Delivery queue (admin or delivery)
//! PUT    /api/users/delivery/orders/{id} - Change status (admin or delivery)
//!
//! # Contact
//! POST   /api/contact                - Submit the contact form
//! GET    /api/contact                - Inbox (admin)
//! PUT    /api/contact/{id}           - Mark read/responded (admin)
//!
//! # Activity & visitors
//! GET    /api/activities             - Latest activity (admin)
//! POST   /api/visitors               - Record a visit
//! GET    /api/visitors/count         - Total visits
//! ```

pub mod activities;
pub mod auth;
pub mod cart;
pub mod contact;
pub mod orders;
pub mod products;
pub mod users;
pub mod visitors;

use axum::{
    Json, Router,
    extract::FromRequest,
    routing::{get, post, put},
};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter, visitor_rate_limiter};
use crate::state::AppState;

/// JSON request body whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap `data` in a success envelope.
    pub const fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Success envelope for paginated listings. The page's own fields sit
/// beside `success` rather than under `data`.
#[derive(Debug, Serialize)]
pub struct ApiPage<T> {
    pub success: bool,
    #[serde(flatten)]
    pub page: T,
}

impl<T: Serialize> ApiPage<T> {
    pub const fn ok(page: T) -> Json<Self> {
        Json(Self {
            success: true,
            page,
        })
    }
}

/// Success envelope for operations without a payload.
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    // Credential endpoints get the strict limiter
    let credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(credentials)
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route("/password", put(auth::change_password))
        .route("/account", axum::routing::delete(auth::delete_account))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/slug/{slug}", get(products::show_by_slug))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/{id}/images", post(products::add_images))
        .route(
            "/{id}/images/{image_id}",
            axum::routing::delete(products::delete_image),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/{item_id}", put(cart::update).delete(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/myorders", get(orders::mine))
        .route("/{id}", get(orders::show).put(orders::update_status))
        .route("/{id}/deliver", put(orders::deliver))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index))
        .route("/{id}/role", put(users::set_role))
        .route("/favorites", get(users::favorites))
        .route("/favorites/{product_id}", post(users::toggle_favorite))
        .route("/delivery/orders", get(users::delivery_orders))
        .route("/delivery/orders/{id}", put(orders::update_status))
}

/// Create the contact routes router.
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(contact::index).post(contact::submit))
        .route("/{id}", put(contact::update_status))
}

/// Create the visitor counter router.
pub fn visitor_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(visitors::record).layer(visitor_rate_limiter()))
        .route("/count", get(visitors::count))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/users", user_routes())
        .nest("/contact", contact_routes())
        .route("/activities", get(activities::index))
        .nest("/visitors", visitor_routes())
        .layer(api_rate_limiter());

    Router::new().nest("/api", api)
}
