//! Integration tests for the order commit.
//!
//! Covers both entry points: `POST /checkout` (session cart) and
//! `POST /api/orders` (explicit lines). Stock checks, decrements, and the
//! order insert either all happen or none do.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;

use shopfront_core::{Money, UserRole};
use shopfront_integration_tests::{TestApp, checkout_form, money, order_request};

// =============================================================================
// Cart Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let app = TestApp::new();
    let jacket = app.stock("Jacket", 6_000, 5);
    let boots = app.stock("Boots", 5_000, 3);
    let mut client = app.client();
    client.add_to_cart(&jacket, 1).await;
    client.add_to_cart(&boots, 1).await;

    let view = client.get("/checkout").await;
    assert_eq!(view.status, StatusCode::OK);
    assert!(!view.body["token"].as_str().unwrap().is_empty());
    assert_eq!(money(&view.body["totals"]["total"]), Money::from_dollars(121));

    let resp = client.post("/checkout", checkout_form()).await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let order = &resp.body["order"];
    assert_eq!(money(&order["subtotal"]), Money::from_dollars(110));
    assert_eq!(money(&order["tax"]), Money::from_dollars(11));
    assert_eq!(money(&order["shippingCost"]), Money::ZERO);
    assert_eq!(money(&order["total"]), Money::from_dollars(121));
    assert_eq!(order["orderStatus"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert!(order["userId"].is_null());

    assert_eq!(app.stock_of(jacket.id), 4);
    assert_eq!(app.stock_of(boots.id), 2);
    assert_eq!(client.get("/cart").await.body["itemCount"], 0);
}

#[tokio::test]
async fn test_checkout_resubmit_returns_same_order() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut client = app.client();
    client.add_to_cart(&tee, 2).await;
    client.get("/checkout").await;

    let first = client.post("/checkout", checkout_form()).await;
    let second = client.post("/checkout", checkout_form()).await;

    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(
        first.body["order"]["orderNumber"],
        second.body["order"]["orderNumber"]
    );
    assert_eq!(app.store.orders().len(), 1);
    assert_eq!(app.stock_of(tee.id), 3);
}

#[tokio::test]
async fn test_next_checkout_gets_new_token() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut client = app.client();

    client.add_to_cart(&tee, 1).await;
    let first_token = client.get("/checkout").await.body["token"].clone();
    let first = client.post("/checkout", checkout_form()).await;

    client.add_to_cart(&tee, 1).await;
    let second_token = client.get("/checkout").await.body["token"].clone();
    let second = client.post("/checkout", checkout_form()).await;

    assert_ne!(first_token, second_token);
    assert_eq!(second.status, StatusCode::CREATED);
    assert_ne!(
        first.body["order"]["orderNumber"],
        second.body["order"]["orderNumber"]
    );
    assert_eq!(app.stock_of(tee.id), 3);
}

#[tokio::test]
async fn test_checkout_with_empty_cart_is_rejected() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client.post("/checkout", checkout_form()).await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error(), "Cart is empty");
}

#[tokio::test]
async fn test_checkout_out_of_stock_keeps_cart() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 2);
    let mut client = app.client();
    client.add_to_cart(&tee, 2).await;

    // Someone else buys the last units first.
    let mut rival = app.client();
    let rival_order = rival
        .post("/api/orders", order_request(&[(&tee, 2)], None))
        .await;
    assert_eq!(rival_order.status, StatusCode::CREATED);

    let resp = client.post("/checkout", checkout_form()).await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert!(resp.error().starts_with("Insufficient stock for Tee"));
    assert_eq!(client.get("/cart").await.body["itemCount"], 2);
    assert_eq!(app.store.orders().len(), 1);
}

#[tokio::test]
async fn test_checkout_validation_lists_fields() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 2);
    let mut client = app.client();
    client.add_to_cart(&tee, 1).await;

    let resp = client
        .post(
            "/checkout",
            json!({"shippingAddress": {"fullName": "Ada"}, "paymentMethod": ""}),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = resp.body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"shippingAddress.email"));
    assert!(fields.contains(&"shippingAddress.zipCode"));
    assert!(fields.contains(&"paymentMethod"));
    assert!(!fields.contains(&"shippingAddress.fullName"));
    assert_eq!(app.stock_of(tee.id), 2);
}

// =============================================================================
// Direct Orders
// =============================================================================

#[tokio::test]
async fn test_order_for_all_remaining_stock_succeeds() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut client = app.client();

    let resp = client
        .post("/api/orders", order_request(&[(&tee, 5)], None))
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(app.stock_of(tee.id), 0);
}

#[tokio::test]
async fn test_order_exceeding_stock_changes_nothing() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut client = app.client();

    let resp = client
        .post("/api/orders", order_request(&[(&tee, 6)], None))
        .await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error(), "Insufficient stock for Tee (M / Black): 5 left");
    assert_eq!(app.stock_of(tee.id), 5);
    assert!(app.store.orders().is_empty());
}

#[tokio::test]
async fn test_failed_line_rolls_back_earlier_lines() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let cap = app.stock("Cap", 1_000, 3);
    let mut client = app.client();

    let resp = client
        .post("/api/orders", order_request(&[(&tee, 2), (&cap, 10)], None))
        .await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(app.stock_of(tee.id), 5);
    assert_eq!(app.stock_of(cap.id), 3);
    assert!(app.store.orders().is_empty());
}

#[tokio::test]
async fn test_small_order_pays_shipping() {
    let app = TestApp::new();
    let socks = app.stock("Socks", 2_000, 5);
    let mut client = app.client();

    let resp = client
        .post("/api/orders", order_request(&[(&socks, 1)], None))
        .await;

    let order = &resp.body["order"];
    assert_eq!(money(&order["subtotal"]), Money::from_dollars(20));
    assert_eq!(money(&order["tax"]), Money::from_dollars(2));
    assert_eq!(money(&order["shippingCost"]), Money::from_dollars(10));
    assert_eq!(money(&order["total"]), Money::from_dollars(32));
}

#[tokio::test]
async fn test_order_lines_snapshot_catalog_price() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut client = app.client();

    let mut body = order_request(&[(&tee, 1)], None);
    body["items"][0]["price"] = json!("0.01");
    let resp = client.post("/api/orders", body).await;

    let item = &resp.body["order"]["items"][0];
    assert_eq!(money(&item["price"]), Money::from_dollars(20));
    assert_eq!(item["title"], "Tee");
    assert_eq!(item["quantity"], 1);
}

#[tokio::test]
async fn test_idempotency_key_replays_order() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut client = app.client();
    let key = uuid::Uuid::new_v4().to_string();

    let first = client
        .post("/api/orders", order_request(&[(&tee, 2)], Some(&key)))
        .await;
    let second = client
        .post("/api/orders", order_request(&[(&tee, 2)], Some(&key)))
        .await;

    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.body["order"]["id"], second.body["order"]["id"]);
    assert_eq!(app.stock_of(tee.id), 3);
    assert_eq!(app.store.orders().len(), 1);
}

#[tokio::test]
async fn test_idempotency_key_is_private_to_each_buyer() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 10);
    let mut alice = app.client();
    let mut mallory = app.client();

    let first = alice
        .post("/api/orders", order_request(&[(&tee, 1)], Some("cart-1")))
        .await;
    let mut body = order_request(&[(&tee, 1)], Some("cart-1"));
    body["shippingAddress"]["email"] = json!("mallory@shop.test");
    let second = mallory.post("/api/orders", body).await;

    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(second.status, StatusCode::CREATED);
    assert_ne!(
        first.body["order"]["orderNumber"],
        second.body["order"]["orderNumber"]
    );
    assert_eq!(
        second.body["order"]["shippingAddress"]["email"],
        "mallory@shop.test"
    );

    let number = first.body["order"]["orderNumber"].as_str().unwrap();
    let resp = mallory.get(&format!("/orders/{number}")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(app.stock_of(tee.id), 8);
    assert_eq!(app.store.orders().len(), 2);
}

#[tokio::test]
async fn test_idempotency_key_reused_for_other_lines_conflicts() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 10);
    let mut client = app.client();

    let first = client
        .post("/api/orders", order_request(&[(&tee, 1)], Some("cart-1")))
        .await;
    let second = client
        .post("/api/orders", order_request(&[(&tee, 4)], Some("cart-1")))
        .await;

    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(
        second.error(),
        "This request was already used for a different order"
    );
    assert_eq!(app.stock_of(tee.id), 9);
    assert_eq!(app.store.orders().len(), 1);
}

#[tokio::test]
async fn test_customer_key_replays_in_new_session_after_sign_in() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut phone = app.client();
    let user = phone.sign_in(UserRole::User).await;

    let first = phone
        .post("/api/orders", order_request(&[(&tee, 1)], Some("cart-1")))
        .await;
    let mut laptop = app.client();
    laptop.sign_in_as(&user).await;
    let second = laptop
        .post("/api/orders", order_request(&[(&tee, 1)], Some("cart-1")))
        .await;

    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.body["order"]["id"], second.body["order"]["id"]);
    assert_eq!(app.stock_of(tee.id), 4);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = TestApp::new();
    let ghost = TestApp::new().stock("Ghost", 1_000, 1);
    let mut client = app.client();

    let resp = client
        .post("/api/orders", order_request(&[(&ghost, 1)], None))
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signed_in_order_is_attributed() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut client = app.client();
    let user = client.sign_in(UserRole::User).await;

    let resp = client
        .post("/api/orders", order_request(&[(&tee, 1)], None))
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.body["order"]["userId"], user.id.to_string());
}

#[tokio::test]
async fn test_concurrent_orders_never_oversell() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 3);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let mut client = app.client();
        let body = order_request(&[(&tee, 1)], None);
        handles.push(tokio::spawn(async move {
            client.post("/api/orders", body).await.status
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() == StatusCode::CREATED {
            created += 1;
        }
    }

    assert_eq!(created, 3);
    assert_eq!(app.stock_of(tee.id), 0);
    assert_eq!(app.store.orders().len(), 3);
}
