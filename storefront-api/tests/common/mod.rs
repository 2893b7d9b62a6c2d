//! Common test utilities for the API integration tests
//!
//! Database-backed tests need PostgreSQL given by DATABASE_URL and return
//! early when it is unset. Router tests that never reach the database use
//! [`offline_app`], which holds a lazy pool that is never connected.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use storefront_api::app::{build_router, AppState};
use storefront_api::config::Config;
use storefront_shared::auth::jwt::{create_token, Claims};
use storefront_shared::auth::password::hash_password;
use storefront_shared::db::migrations::{ensure_database_exists, run_migrations};
use storefront_shared::models::address::{Address, CreateAddress};
use storefront_shared::models::product::{CreateProduct, Product};
use storefront_shared::models::user::{CreateUser, Role, User};
use tower::Service as _;
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret-at-least-32-bytes";

fn config(database_url: &str) -> Config {
    let upload_dir = std::env::temp_dir()
        .join(format!("storefront-api-test-{}", Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();

    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(database_url.to_string()),
        "SESSION_SECRET" => Some(SECRET.to_string()),
        "UPLOAD_DIR" => Some(upload_dir.clone()),
        _ => None,
    })
    .expect("Test configuration should be valid")
}

/// Router over a pool that never connects
pub fn offline_app() -> Router {
    let config = config("postgresql://nobody@127.0.0.1:1/unused");
    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy(&config.database.url)
        .expect("Lazy pool should accept the URL");

    build_router(AppState::new(pool, config))
}

/// Test context with a migrated database and a router over it
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
}

impl TestContext {
    /// Returns `None` when DATABASE_URL is unset
    pub async fn new() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        };

        // Parallel tests may race to create it; a real failure shows up below
        if let Err(e) = ensure_database_exists(&url).await {
            eprintln!("ensure_database_exists: {e}");
        }

        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("Failed to connect to test database");
        run_migrations(&db).await.expect("Migrations failed");

        let state = AppState::new(db.clone(), config(&url));
        state.uploads.ensure_dir().await.expect("Upload dir");

        Some(Self {
            db,
            app: build_router(state),
        })
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().call(request).await.expect("Router is infallible")
    }
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// Creates an active user who can log in with the returned password
pub async fn create_user(db: &PgPool, role: Role) -> (User, String) {
    let name = unique(role.as_str());
    let password = format!("pw-{}", Uuid::new_v4().simple());
    let user = User::create(
        db,
        CreateUser {
            email: format!("{}@example.com", name),
            name,
            password_hash: hash_password(&password).expect("Hash should succeed"),
            role,
        },
    )
    .await
    .expect("Failed to create user");

    (user, password)
}

pub async fn create_product(db: &PgPool, seller: &User, price_cents: i64) -> Product {
    let mut conn = db.acquire().await.expect("Failed to acquire connection");
    Product::create(
        &mut *conn,
        seller.id,
        CreateProduct {
            category_id: None,
            product_name: unique("product"),
            size: "A4".to_string(),
            pages: 64,
            stock: 5,
            price_cents,
            image_path: None,
        },
    )
    .await
    .expect("Failed to create product")
}

pub async fn create_address(db: &PgPool, user: &User) -> Address {
    Address::create(
        db,
        user.id,
        CreateAddress {
            name: user.name.clone(),
            address: "2 Test Avenue".to_string(),
            phone: "555-0101".to_string(),
        },
    )
    .await
    .expect("Failed to create address")
}

/// `session=<token>` cookie for a user
pub fn session_cookie(user: &User) -> String {
    let claims = Claims::new(user.id, user.role, chrono::Duration::hours(1));
    format!("session={}", create_token(&claims, SECRET).expect("Token"))
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// URL-encoded form post
pub fn post_form(uri: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Request<Body> {
    let body = serde_urlencoded::to_string(fields).expect("Form fields should encode");

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn post_json(uri: &str, cookie: Option<&str>, json: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(json.to_string())).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), to);
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!("Body is not JSON ({e}): {}", String::from_utf8_lossy(&bytes))
    })
}
