//! HTTP route handlers for the store finder.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Store listing (home)
//! GET  /stores                 - Store listing
//! GET  /store/{slug}           - Store detail
//! GET  /tags                   - Tag counts + stores carrying any tag
//! GET  /tags/{tag}             - Tag counts + stores carrying the tag
//!
//! # Stores (requires auth)
//! GET  /add                    - Empty store form
//! POST /stores                 - Create store (multipart, optional photo)
//! GET  /stores/{id}/edit       - Edit form
//! POST /stores/{id}            - Update store (multipart, optional photo)
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login action (rate limited)
//! GET  /register               - Register page
//! POST /register               - Register action (rate limited)
//! POST /logout                 - Logout action
//!
//! # API
//! GET  /api/search?q=          - JSON search results (rate limited)
//!
//! # Health
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (repository ping)
//! GET  /favicon.ico            - Redirect to the site icon
//!
//! # Files
//! GET  /static/*               - CSS, JS and images shipped with the site
//! GET  /uploads/*              - Processed store photos
//! ```

pub mod api;
pub mod auth;
pub mod health;
pub mod stores;
pub mod tags;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header::CACHE_CONTROL},
    middleware,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer};

use crate::error::NotFoundTemplate;
use crate::middleware::{
    QuietPage, api_rate_limiter, auth_rate_limiter, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Assets shipped with the crate (CSS, JS, placeholder images).
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index).post(stores::create))
        .route("/store/{slug}", get(stores::show))
        .route("/add", get(stores::add))
        .route("/stores/{id}", post(stores::update))
        .route("/stores/{id}/edit", get(stores::edit))
}

/// Create the tag routes router.
pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(tags::index))
        .route("/tags/{tag}", get(tags::show))
}

/// Create the auth routes router.
///
/// Only the form submissions are rate limited; viewing the forms is not.
pub fn auth_routes() -> Router<AppState> {
    let submissions = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route_layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(submissions)
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(api::search))
        .route_layer(api_rate_limiter())
}

/// Create all page and API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/favicon.ico", get(favicon))
        .merge(store_routes())
        .merge(tag_routes())
        .merge(auth_routes())
        .nest("/api", api_routes())
}

/// Build the complete application: routes, file serving, 404 fallback and
/// the per-request middleware.
///
/// The session layer is applied by the caller, which picks the session store.
pub fn app(state: AppState) -> Router {
    let uploads = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=86400"),
        ))
        .service(ServeDir::new(state.media().upload_dir()));

    let assets = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=604800"),
        ))
        .service(ServeDir::new(STATIC_DIR));

    let body_limit = state.config().max_upload_bytes;

    routes()
        .nest_service("/uploads", uploads)
        .nest_service("/static", assets)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Browsers ask for `/favicon.ico` regardless of the `<link rel="icon">`.
async fn favicon() -> Redirect {
    Redirect::permanent("/static/images/store.svg")
}

/// Render the 404 page for unknown paths. Pending flashes are kept for the
/// next real page.
async fn not_found(QuietPage(page): QuietPage) -> impl IntoResponse {
    (axum::http::StatusCode::NOT_FOUND, NotFoundTemplate { page })
}
