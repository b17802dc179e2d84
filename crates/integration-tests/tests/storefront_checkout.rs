//! Integration tests for the cart, checkout, and order lifecycle.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (task db:start, dfj-cli migrate)
//! - The storefront server running (cargo run -p dryfruit-storefront)
//!
//! Run with: cargo test -p dryfruit-integration-tests -- --ignored

use dryfruit_core::Role;
use dryfruit_integration_tests::{
    api, create_product, data, price, register_shopper, shipping_info, staff_client,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

async fn add_to_cart(client: &Client, product: &Value, variant: usize, quantity: u32) -> Value {
    let resp = client
        .post(api("/cart"))
        .json(&json!({
            "productId": product["id"],
            "variantId": product["variants"][variant]["id"],
            "quantity": quantity,
        }))
        .send()
        .await
        .expect("Failed to add to cart");
    data(resp, StatusCode::OK).await
}

async fn place_order(client: &Client) -> reqwest::Response {
    client
        .post(api("/orders"))
        .json(&json!({ "shippingInfo": shipping_info(), "paymentMethod": "cod" }))
        .send()
        .await
        .expect("Failed to place order")
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_prices_from_live_variants() {
    let admin = staff_client(Role::Admin).await;
    let product = create_product(&admin, &[("500g", 500), ("250g", 300)]).await;

    let (shopper, _) = register_shopper().await;
    add_to_cart(&shopper, &product, 0, 2).await;
    let cart = add_to_cart(&shopper, &product, 1, 1).await;
    assert_eq!(cart["itemCount"], 3);
    assert!((price(&cart["subtotal"]) - 1300.0).abs() < f64::EPSILON);

    let order = data(place_order(&shopper).await, StatusCode::CREATED).await;
    assert!((price(&order["itemsPrice"]) - 1300.0).abs() < f64::EPSILON);
    assert!((price(&order["totalPrice"]) - 1300.0).abs() < f64::EPSILON);
    assert_eq!(order["status"], "processing");
    assert_eq!(order["paymentInfo"]["status"], "pending");
    assert!(order["orderNumber"].as_i64().expect("orderNumber") > 1000);

    // The cart is emptied by the same transaction
    let resp = shopper.get(api("/cart")).send().await.expect("cart");
    let cart = data(resp, StatusCode::OK).await;
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_order_numbers_increase() {
    let admin = staff_client(Role::Admin).await;
    let product = create_product(&admin, &[("1kg", 900)]).await;
    let (shopper, _) = register_shopper().await;

    add_to_cart(&shopper, &product, 0, 1).await;
    let first = data(place_order(&shopper).await, StatusCode::CREATED).await;
    add_to_cart(&shopper, &product, 0, 1).await;
    let second = data(place_order(&shopper).await, StatusCode::CREATED).await;

    let first = first["orderNumber"].as_i64().expect("orderNumber");
    let second = second["orderNumber"].as_i64().expect("orderNumber");
    assert!(second > first);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_empty_cart_cannot_be_ordered() {
    let (shopper, _) = register_shopper().await;

    let resp = place_order(&shopper).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Response was not JSON");
    assert_eq!(body["message"], "Your cart is empty");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_quantity_update_and_removal() {
    let admin = staff_client(Role::Admin).await;
    let product = create_product(&admin, &[("250g", 250)]).await;
    let (shopper, _) = register_shopper().await;

    let cart = add_to_cart(&shopper, &product, 0, 1).await;
    let line = cart["items"][0]["id"].as_str().expect("line id").to_owned();

    let resp = shopper
        .put(api(&format!("/cart/{line}")))
        .json(&json!({ "quantity": 4 }))
        .send()
        .await
        .expect("Failed to update quantity");
    let cart = data(resp, StatusCode::OK).await;
    assert_eq!(cart["itemCount"], 4);

    let resp = shopper
        .put(api(&format!("/cart/{line}")))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .expect("Failed to update quantity");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = shopper
        .delete(api(&format!("/cart/{line}")))
        .send()
        .await
        .expect("Failed to remove line");
    let cart = data(resp, StatusCode::OK).await;
    assert_eq!(cart["itemCount"], 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_delivery_partner_moves_order_through_fulfillment() {
    let admin = staff_client(Role::Admin).await;
    let product = create_product(&admin, &[("500g", 450)]).await;
    let (shopper, _) = register_shopper().await;
    add_to_cart(&shopper, &product, 0, 1).await;
    let order = data(place_order(&shopper).await, StatusCode::CREATED).await;
    let id = order["id"].as_i64().expect("order id");

    // Shoppers can't change status
    let resp = shopper
        .put(api(&format!("/orders/{id}")))
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .expect("Failed to update status");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let delivery = staff_client(Role::Delivery).await;
    let resp = delivery
        .get(api("/users/delivery/orders"))
        .send()
        .await
        .expect("Failed to list delivery orders");
    let queue = data(resp, StatusCode::OK).await;
    assert!(
        queue
            .as_array()
            .expect("queue")
            .iter()
            .any(|o| o["id"].as_i64() == Some(id))
    );

    let resp = delivery
        .put(api(&format!("/users/delivery/orders/{id}")))
        .json(&json!({ "status": "teleported" }))
        .send()
        .await
        .expect("Failed to update status");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = delivery
        .put(api(&format!("/users/delivery/orders/{id}")))
        .json(&json!({ "status": "delivered" }))
        .send()
        .await
        .expect("Failed to update status");
    let delivered = data(resp, StatusCode::OK).await;
    assert_eq!(delivered["status"], "delivered");
    assert!(delivered["deliveredAt"].is_string());

    // Delivered orders drop out of the queue
    let resp = delivery
        .get(api("/users/delivery/orders"))
        .send()
        .await
        .expect("Failed to list delivery orders");
    let queue = data(resp, StatusCode::OK).await;
    assert!(
        !queue
            .as_array()
            .expect("queue")
            .iter()
            .any(|o| o["id"].as_i64() == Some(id))
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_orders_are_private_to_their_owner() {
    let admin = staff_client(Role::Admin).await;
    let product = create_product(&admin, &[("500g", 450)]).await;
    let (owner, _) = register_shopper().await;
    add_to_cart(&owner, &product, 0, 1).await;
    let order = data(place_order(&owner).await, StatusCode::CREATED).await;
    let id = order["id"].as_i64().expect("order id");

    let (stranger, _) = register_shopper().await;
    let resp = stranger
        .get(api(&format!("/orders/{id}")))
        .send()
        .await
        .expect("Failed to get order");
    assert!(resp.status().is_client_error());

    let resp = owner.get(api("/orders/myorders")).send().await.expect("mine");
    let mine = data(resp, StatusCode::OK).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));

    let resp = admin
        .get(api(&format!("/orders/{id}")))
        .send()
        .await
        .expect("Failed to get order");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_accepts_blank_location() {
    let admin = staff_client(Role::Admin).await;
    let product = create_product(&admin, &[("500g", 450)]).await;
    let (shopper, _) = register_shopper().await;
    add_to_cart(&shopper, &product, 0, 1).await;

    // Geolocation denied in the browser
    let mut shipping = shipping_info();
    shipping["location"] = json!({ "address": "", "latitude": "", "longitude": "" });
    let resp = shopper
        .post(api("/orders"))
        .json(&json!({ "shippingInfo": shipping, "paymentMethod": "cod" }))
        .send()
        .await
        .expect("Failed to place order");
    let order = data(resp, StatusCode::CREATED).await;
    assert!(order["shippingInfo"]["location"].is_null());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_demoted_admin_loses_access_without_logging_out() {
    let product_admin = staff_client(Role::Admin).await;
    let product = create_product(&product_admin, &[("500g", 450)]).await;
    let (shopper, _) = register_shopper().await;
    add_to_cart(&shopper, &product, 0, 1).await;
    let order = data(place_order(&shopper).await, StatusCode::CREATED).await;
    let id = order["id"].as_i64().expect("order id");

    let demoted = staff_client(Role::Admin).await;
    let resp = demoted.get(api("/auth/profile")).send().await.expect("profile");
    let profile = data(resp, StatusCode::OK).await;
    let demoted_id = profile["id"].as_i64().expect("user id");

    let resp = product_admin
        .put(api(&format!("/users/{demoted_id}/role")))
        .json(&json!({ "role": "user" }))
        .send()
        .await
        .expect("Failed to change role");
    assert_eq!(resp.status(), StatusCode::OK);

    // Same session cookie as before the role change
    let resp = demoted
        .put(api(&format!("/orders/{id}")))
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .expect("Failed to update status");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = demoted.get(api("/orders")).send().await.expect("orders");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_admin_marks_order_delivered() {
    let admin = staff_client(Role::Admin).await;
    let product = create_product(&admin, &[("500g", 450)]).await;
    let (shopper, _) = register_shopper().await;
    add_to_cart(&shopper, &product, 0, 2).await;
    let order = data(place_order(&shopper).await, StatusCode::CREATED).await;
    let id = order["id"].as_i64().expect("order id");

    let resp = shopper
        .put(api(&format!("/orders/{id}/deliver")))
        .send()
        .await
        .expect("Failed to deliver");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = admin
        .put(api(&format!("/orders/{id}/deliver")))
        .send()
        .await
        .expect("Failed to deliver");
    let delivered = data(resp, StatusCode::OK).await;
    assert_eq!(delivered["status"], "delivered");
    assert!(delivered["deliveredAt"].is_string());

    // Detail lines carry the live variant alongside the snapshot
    let resp = shopper
        .get(api(&format!("/orders/{id}")))
        .send()
        .await
        .expect("Failed to get order");
    let detail = data(resp, StatusCode::OK).await;
    let line = &detail["items"][0];
    assert_eq!(line["quantity"], 2);
    assert_eq!(line["variantDetails"]["id"], product["variants"][0]["id"]);
    assert_eq!(line["variantDetails"]["weight"], "500g");
}
