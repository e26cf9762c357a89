//! Integration tests for Shopfront.
//!
//! Tests drive the real storefront router in process. Sessions live in a
//! `MemoryStore` and checkout runs against `MemoryCheckoutStore`, so the
//! cart, checkout, and access-control paths need no database. Routes that
//! read `PostgreSQL` directly are not covered here.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_storefront_health() {
//!     let app = TestApp::new();
//!     let mut client = app.client();
//!     let resp = client.get("/health").await;
//!     assert_eq!(resp.status, StatusCode::OK);
//! }
//! ```

#![allow(clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session};

use shopfront_core::inventory::Variant;
use shopfront_core::{Email, Money, ProductId, UserId, UserRole};
use shopfront_storefront::config::{LogFormat, SentryConfig, StorefrontConfig};
use shopfront_storefront::middleware::{session_layer, set_current_user};
use shopfront_storefront::models::CurrentUser;
use shopfront_storefront::routes;
use shopfront_storefront::services::checkout::{MemoryCheckoutStore, StockedProduct};
use shopfront_storefront::state::AppState;

/// Test-only route that signs the posted user into the session.
pub const SIGN_IN_PATH: &str = "/test/sign-in";

/// Size and color of every variant created by [`TestApp::stock`].
pub const SIZE: &str = "M";
pub const COLOR: &str = "Black";

/// Storefront configuration for tests: plain HTTP, no rate limits.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: "postgres://shopfront@localhost/shopfront_test".to_owned().into(),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: url::Url::parse("http://localhost:3000").expect("valid test URL"),
        rate_limit: false,
        log_format: LogFormat::Text,
        sentry: SentryConfig::default(),
    }
}

/// An in-process storefront with an in-memory checkout store.
pub struct TestApp {
    router: Router,
    pub store: MemoryCheckoutStore,
}

impl TestApp {
    /// Build the app. Must be called inside a Tokio runtime.
    ///
    /// The database pool is lazy and never connects; requests that reach
    /// `PostgreSQL` fail with a server error.
    #[must_use]
    pub fn new() -> Self {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://shopfront@localhost/shopfront_test")
            .expect("lazy pool");
        let store = MemoryCheckoutStore::new();
        let state =
            AppState::with_checkout_store(config.clone(), pool, std::sync::Arc::new(store.clone()));

        let routes = routes::routes(config.rate_limit).route(SIGN_IN_PATH, post(sign_in));
        let router = shopfront_storefront::with_layers(
            routes,
            state,
            session_layer(MemoryStore::default(), &config),
        );

        Self { router, store }
    }

    /// A client with its own cookie jar (one browser).
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Add a product with one `M / Black` variant.
    pub fn stock(&self, title: &str, price_cents: i64, stock: u32) -> StockedProduct {
        let product = StockedProduct {
            id: ProductId::generate(),
            title: title.to_owned(),
            slug: title.to_lowercase().replace(' ', "-"),
            price: Money::from_cents(price_cents),
            images: vec![format!("/images/{}.jpg", title.to_lowercase())],
            variants: vec![Variant {
                size: SIZE.to_owned(),
                color: COLOR.to_owned(),
                stock,
            }],
        };
        self.store.insert_product(product.clone());
        product
    }

    /// Remaining stock of a product's `M / Black` variant.
    #[must_use]
    pub fn stock_of(&self, id: ProductId) -> u32 {
        self.store
            .product(id)
            .and_then(|p| p.variants.into_iter().find(|v| v.size == SIZE))
            .map_or(0, |v| v.stock)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

async fn sign_in(session: Session, Json(user): Json<CurrentUser>) -> StatusCode {
    match set_current_user(&session, &user).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Response with the body parsed as JSON (`Null` when it isn't JSON).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestResponse {
    /// The `error` message of an error body.
    #[must_use]
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// Sends requests through the router, carrying the session cookie.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("valid request");

        self.execute(request).await
    }

    /// Send a prepared request through the router.
    pub async fn execute(&mut self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            self.cookie = Some(cookie.to_owned());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    /// Sign a new user with `role` into this client's session.
    pub async fn sign_in(&mut self, role: UserRole) -> CurrentUser {
        let id = UserId::generate();
        let user = CurrentUser {
            id,
            email: Email::parse(&format!("{id}@shop.test")).expect("valid email"),
            name: "Test User".to_owned(),
            role,
        };
        self.sign_in_as(&user).await;
        user
    }

    /// Sign an existing user into this client's session.
    pub async fn sign_in_as(&mut self, user: &CurrentUser) {
        let body = serde_json::to_value(user).expect("serializable user");
        let resp = self.post(SIGN_IN_PATH, body).await;
        assert_eq!(resp.status, StatusCode::NO_CONTENT);
    }

    /// Add `quantity` of a product's `M / Black` variant to the cart.
    pub async fn add_to_cart(&mut self, product: &StockedProduct, quantity: u32) -> TestResponse {
        self.post(
            "/cart/add",
            json!({
                "productId": product.id,
                "size": SIZE,
                "color": COLOR,
                "quantity": quantity,
            }),
        )
        .await
    }
}

/// A complete, valid shipping address.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "fullName": "Ada Buyer",
        "email": "ada@shop.test",
        "phone": "+1 555 0100",
        "address": "1 Market St",
        "city": "Springfield",
        "state": "IL",
        "zipCode": "62701",
        "country": "US",
    })
}

/// A `POST /checkout` form.
#[must_use]
pub fn checkout_form() -> Value {
    json!({
        "shippingAddress": shipping_address(),
        "paymentMethod": "card",
    })
}

/// A `POST /api/orders` body for `(product, quantity)` lines.
#[must_use]
pub fn order_request(lines: &[(&StockedProduct, i64)], idempotency_key: Option<&str>) -> Value {
    let items: Vec<Value> = lines
        .iter()
        .map(|(product, quantity)| {
            json!({
                "productId": product.id,
                "quantity": quantity,
                "size": SIZE,
                "color": COLOR,
            })
        })
        .collect();

    json!({
        "items": items,
        "shippingAddress": shipping_address(),
        "paymentMethod": "card",
        "idempotencyKey": idempotency_key,
    })
}

/// Parse a money field.
#[must_use]
pub fn money(value: &Value) -> Money {
    serde_json::from_value(value.clone()).expect("money is a decimal string")
}
