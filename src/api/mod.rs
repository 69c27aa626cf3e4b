//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints of the sattl backend:
//! - Auth endpoints (token, register, me, admin check)
//! - Adventure endpoints
//! - Tag endpoints
//! - Equipment endpoints
//! - Image endpoints (multipart upload)
//! - Profile endpoints
//! - Read-only media file serving under `/media`

pub mod adventures;
pub mod auth;
pub mod common;
pub mod equipment;
pub mod images;
pub mod middleware;
pub mod profiles;
pub mod tags;


use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let max_image_size = state.config.media.max_image_size;

    // Admin routes (need admin flag)
    let admin_routes = Router::new()
        .merge(auth::admin_router())
        .merge(adventures::admin_router())
        .merge(equipment::admin_router())
        .merge(images::admin_router(max_image_size))
        .merge(profiles::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need a valid token)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(profiles::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .merge(auth::public_router())
        .merge(adventures::public_router())
        .merge(tags::router())
        .merge(equipment::public_router())
        .merge(images::public_router())
        .merge(profiles::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origins(&state.config.server.cors_origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let media = ServeDir::new(&state.config.media.root);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service("/media", media)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// GET / - Welcome message
async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    let project = &state.config.server.project_name;
    Json(json!({
        "message": format!("Welcome to the {} API", project),
        "project": project,
    }))
}

/// Parse configured CORS origins; `*` allows any origin
fn cors_origins(origins: &[String]) -> AllowOrigin {
    if origins.iter().any(|o| o.trim() == "*") {
        return AllowOrigin::from(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    AllowOrigin::list(parsed)
}
