//! Router configuration for the Web API.

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::WebConfig;

use super::handlers::{
    create_folder, delete_file, delete_folder, download_file, get_file, get_folder,
    get_folder_path, get_storage, list_files, list_folders, login, logout, me, preview_file,
    refresh, register, search_files, update_file, upload_file, AppState,
};
use super::middleware::{
    api_rate_limit, create_cors_layer, jwt_auth, login_rate_limit, security_headers,
    RateLimitState,
};

/// Room for multipart boundaries and the `folder_id` field on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Span for one HTTP request. The query string is left out so `?token=`
/// never reaches the logs.
fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// Create the `/api` router.
pub fn create_router(
    app_state: Arc<AppState>,
    rate_limits: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let login_limits = rate_limits.clone();
    let auth_routes = Router::new()
        .route(
            "/login",
            post(login).route_layer(middleware::from_fn(move |req, next| {
                let state = login_limits.clone();
                login_rate_limit(state, req, next)
            })),
        )
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/me", get(me));

    let user_routes = Router::new().route("/storage", get(get_storage));

    let folder_routes = Router::new()
        .route("/", get(list_folders).post(create_folder))
        .route("/:id", get(get_folder).delete(delete_folder))
        .route("/:id/path", get(get_folder_path));

    let upload_limit = app_state.max_upload_size.saturating_add(MULTIPART_OVERHEAD);
    let file_routes = Router::new()
        .route("/", get(list_files))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(
                usize::try_from(upload_limit).unwrap_or(usize::MAX),
            )),
        )
        .route("/search", get(search_files))
        .route(
            "/:id",
            get(get_file).patch(update_file).delete(delete_file),
        )
        .route("/:id/download", get(download_file))
        .route("/:id/preview", get(preview_file));

    let api_limits = rate_limits;
    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/folders", folder_routes)
        .nest("/files", file_routes)
        .route_layer(middleware::from_fn(move |req, next| {
            let state = api_limits.clone();
            api_rate_limit(state, req, next)
        }));

    let jwt_state = app_state.jwt.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Serve the built client, falling back to `index.html` for client-side routes.
///
/// Returns `None` when the directory doesn't exist.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let root = Path::new(static_path);
    if !root.is_dir() {
        tracing::warn!("Static path {} not found, not serving client", static_path);
        return None;
    }

    let index = ServeFile::new(root.join("index.html"));
    Some(Router::new().fallback_service(ServeDir::new(root).fallback(index)))
}

/// The complete application: API, health check, optional static client
/// and gzip compression.
pub fn create_app(
    app_state: Arc<AppState>,
    rate_limits: Arc<RateLimitState>,
    config: &WebConfig,
) -> Router {
    let mut router =
        create_router(app_state, rate_limits, &config.cors_origins).merge(create_health_router());

    if config.serve_static {
        if let Some(static_router) = create_static_router(&config.static_path) {
            router = router.merge(static_router);
        }
    }

    router.layer(CompressionLayer::new())
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
