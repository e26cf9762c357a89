//! Integration tests for access control and request plumbing.
//!
//! Admin and account gates reject before any handler reads the database,
//! so these run against the lazy test pool.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;

use shopfront_core::UserRole;
use shopfront_integration_tests::{TestApp, checkout_form, order_request};

// =============================================================================
// Account Gate
// =============================================================================

#[tokio::test]
async fn test_account_requires_sign_in() {
    let app = TestApp::new();
    let mut client = app.client();

    for path in ["/account", "/account/orders"] {
        let resp = client.get(path).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(resp.error(), "Unauthorized");
    }
}

#[tokio::test]
async fn test_logout_signs_out_but_keeps_cart() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut client = app.client();
    client.sign_in(UserRole::User).await;
    client.add_to_cart(&tee, 1).await;

    let resp = client.post("/auth/logout", json!({})).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["success"], true);
    assert_eq!(client.get("/account").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(client.get("/cart").await.body["itemCount"], 1);
}

// =============================================================================
// Admin Gate
// =============================================================================

const ADMIN_READS: [&str; 6] = [
    "/admin/products",
    "/admin/collections",
    "/admin/orders",
    "/admin/cms/hero",
    "/admin/cms/banners",
    "/admin/settings",
];

#[tokio::test]
async fn test_admin_routes_require_sign_in() {
    let app = TestApp::new();
    let mut client = app.client();

    for path in ADMIN_READS {
        let resp = client.get(path).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn test_admin_routes_reject_customers() {
    let app = TestApp::new();
    let mut client = app.client();
    client.sign_in(UserRole::User).await;

    for path in ADMIN_READS {
        let resp = client.get(path).await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN, "{path}");
        assert_eq!(resp.error(), "Admin access required");
    }
}

#[tokio::test]
async fn test_admin_writes_reject_customers() {
    let app = TestApp::new();
    let mut client = app.client();
    client.sign_in(UserRole::User).await;
    let id = uuid::Uuid::new_v4();

    let create = client
        .post("/admin/products", json!({"title": "Free Stuff"}))
        .await;
    let status = client
        .patch(
            &format!("/admin/orders/{id}/status"),
            json!({"status": "shipped"}),
        )
        .await;
    let delete = client
        .send(Method::DELETE, &format!("/admin/products/{id}"), None)
        .await;

    assert_eq!(create.status, StatusCode::FORBIDDEN);
    assert_eq!(status.status, StatusCode::FORBIDDEN);
    assert_eq!(delete.status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Order Confirmation
// =============================================================================

#[tokio::test]
async fn test_guest_can_view_own_confirmation() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut guest = app.client();
    guest.add_to_cart(&tee, 1).await;
    let placed = guest.post("/checkout", checkout_form()).await;
    let number = placed.body["order"]["orderNumber"].as_str().unwrap();

    let resp = guest.get(&format!("/orders/{number}")).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["orderNumber"], number);
}

#[tokio::test]
async fn test_confirmation_hidden_from_other_sessions() {
    let app = TestApp::new();
    let tee = app.stock("Tee", 2_000, 5);
    let mut buyer = app.client();
    let placed = buyer
        .post("/api/orders", order_request(&[(&tee, 1)], None))
        .await;
    let number = placed.body["order"]["orderNumber"].as_str().unwrap();

    let mut stranger = app.client();
    let resp = stranger.get(&format!("/orders/{number}")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let mut customer = app.client();
    customer.sign_in(UserRole::User).await;
    let resp = customer.get(&format!("/orders/{number}")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let mut admin = app.client();
    admin.sign_in(UserRole::Admin).await;
    let resp = admin.get(&format!("/orders/{number}")).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_order_number_is_not_found() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client.get("/orders/not-an-order").await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Request Plumbing
// =============================================================================

#[tokio::test]
async fn test_health_is_plain_text() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client.get("/health").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.text, "ok");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client.get("/health").await;

    let id = resp.headers.get("x-request-id").unwrap().to_str().unwrap();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = TestApp::new();
    let mut client = app.client();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "upstream-1234")
        .body(Body::empty())
        .unwrap();
    let resp = client.execute(request).await;

    assert_eq!(resp.headers.get("x-request-id").unwrap(), "upstream-1234");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();
    let mut client = app.client();

    let resp = client.get("/wp-admin").await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
