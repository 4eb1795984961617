//! API layer - HTTP handlers and routing
//!
//! - `/api/user/...` - registration, tokens, own profile
//! - `/api/recipe/...` - recipes and tags of the authenticated user
//! - `/posts/` - public blog posts
//! - `/health` - liveness with a database ping

pub mod middleware;
pub mod posts;
pub mod recipes;
pub mod tags;
pub mod users;


use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::db::DatabasePool;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let auth = axum_middleware::from_fn_with_state(state, middleware::require_auth);

    let user_routes = users::public_router().merge(users::protected_router().route_layer(auth.clone()));

    let recipe_routes = Router::new()
        .merge(recipes::router())
        .merge(tags::router())
        .route_layer(auth);

    Router::new()
        .nest("/user", user_routes)
        .nest("/recipe", recipe_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", build_api_router(state.clone()))
        .merge(posts::router())
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origin. `*` allows any origin without
/// credentials; an unparseable origin allows none.
fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origin.trim() == "*" {
        return cors.allow_origin(AllowOrigin::any());
    }

    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value).allow_credentials(true),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Ignoring invalid CORS origin");
            cors
        }
    }
}

/// GET /health
async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.pool.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable"})),
            )
        }
    }
}
