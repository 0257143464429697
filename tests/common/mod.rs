#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, Response};
use axum::Router;
use rust_decimal::Decimal;
use tower::ServiceExt;
use uuid::Uuid;

use shopfront::app::build_app;
use shopfront::config::AppConfig;
use shopfront::products::memory::InMemoryInventoryStore;
use shopfront::products::repo::InventoryStore;
use shopfront::products::repo_types::ProductFields;
use shopfront::state::AppState;

pub const SECRET: &str = "integration-test-secret";

/// Router over in-memory stores, plus a handle on the inventory for seeding and
/// inspection.
pub struct TestApp {
    pub router: Router,
    pub inventory: Arc<InMemoryInventoryStore>,
}

pub fn build_test_app() -> TestApp {
    let inventory = Arc::new(InMemoryInventoryStore::new());
    let state = AppState::in_memory(Arc::new(AppConfig::with_secret(SECRET)), inventory.clone())
        .expect("state should build");
    TestApp {
        router: build_app(state),
        inventory,
    }
}

impl TestApp {
    pub async fn seed_product(&self, name: &str, quantity: i32) -> Uuid {
        self.inventory
            .create(ProductFields {
                name: name.into(),
                description: None,
                price: Decimal::new(1000, 2),
                quantity,
            })
            .await
            .expect("seed product")
            .id
    }

    pub async fn stock(&self, id: Uuid) -> i32 {
        self.inventory
            .get(id)
            .await
            .expect("get product")
            .expect("product exists")
            .quantity
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub fn post_json(uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn post_form(uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder =
        Request::post(uri).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, token.to_string());
    }
    builder.body(Body::empty()).expect("valid request")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
