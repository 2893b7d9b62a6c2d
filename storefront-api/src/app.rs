/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use storefront_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        gate::{require_admin, require_applicant, require_seller, require_shopper, session_gate},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use storefront_shared::storage::UploadStore;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Room for form fields next to the uploaded files
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Upload directory for product images and seller documents
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let uploads = UploadStore::new(config.uploads.dir.clone(), config.uploads.max_bytes);
        Self {
            db,
            config: Arc::new(config),
            uploads,
        }
    }

    /// Secret used to sign and verify session tokens
    pub fn session_secret(&self) -> &str {
        &self.config.session.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /health, /signup, /login, /logout, /categories   public
/// /uploads/*, /view_document/*                     public, static files
/// /cart, /checkout, /place_order, /orders_dashboard,
///   /addresses_dashboard, /update-profile, ...     session
/// /buyer_dashboard                                 session + buyer|seller
/// /seller_dashboard, /seller_orders, ...           session + seller
/// /seller_registration                             session + buyer
/// /admin/*                                         session + admin
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{
        account, addresses, admin, auth, cart, catalog, checkout, health, orders, registration,
        seller,
    };

    let session = || from_fn_with_state(state.clone(), session_gate);

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/categories", get(catalog::list_categories));

    let session_routes = Router::new()
        .route("/cart", get(cart::view_cart))
        .route("/_cart", post(cart::add_to_cart))
        .route("/update_cart", post(cart::update_cart))
        .route("/remove_from_cart", post(cart::remove_from_cart))
        .route("/checkout", get(checkout::review_cart).post(checkout::review_selection))
        .route("/place_order", post(checkout::place_order))
        .route("/orders_dashboard", get(orders::orders_dashboard))
        .route("/cancel_order/:id", post(orders::cancel_order))
        .route("/add_category", post(catalog::add_category))
        .route("/addresses_dashboard", get(addresses::list_addresses))
        .route("/add_address", post(addresses::add_address))
        .route("/delete_address/:id", post(addresses::delete_address))
        .route("/update-profile", post(account::update_profile))
        .route("/change-password", post(account::change_password))
        .route_layer(session());

    let shopper_routes = Router::new()
        .route("/buyer_dashboard", get(catalog::buyer_dashboard))
        .route_layer(from_fn(require_shopper))
        .route_layer(session());

    let seller_routes = Router::new()
        .route("/seller_dashboard", get(seller::seller_dashboard))
        .route("/seller_orders", get(seller::seller_orders))
        .route("/update_order_status", post(seller::update_order_status))
        .route("/add_product", post(seller::add_product))
        .route(
            "/edit_product/:id",
            get(seller::get_product).post(seller::edit_product),
        )
        .route("/archive_product/:id", post(seller::archive_product))
        .route("/unarchive_product/:id", post(seller::unarchive_product))
        .route("/update_seller_account", post(account::update_seller_account))
        .route_layer(from_fn(require_seller))
        .route_layer(session());

    let applicant_routes = Router::new()
        .route("/seller_registration", post(registration::submit_seller_registration))
        .route_layer(from_fn(require_applicant))
        .route_layer(session());

    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/approve_request/:id", post(admin::approve_request))
        .route("/reject_request/:id", post(admin::reject_request))
        .route("/archive_user/:id", post(admin::archive_user))
        .route("/unarchive_user/:id", post(admin::unarchive_user))
        .route("/change_role/:id", post(admin::change_role))
        .route_layer(from_fn(require_admin))
        .route_layer(session());

    let upload_dir = state.uploads.root().to_path_buf();

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let body_limit = state.config.uploads.max_bytes.saturating_mul(2) + FORM_OVERHEAD_BYTES;
    let production = state.config.api.production;

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(shopper_routes)
        .merge(seller_routes)
        .merge(applicant_routes)
        .nest("/admin", admin_routes)
        .nest_service("/uploads", ServeDir::new(&upload_dir))
        .nest_service("/view_document", ServeDir::new(&upload_dir))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
