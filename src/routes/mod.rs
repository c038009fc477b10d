use axum::{
    http::{Method, StatusCode},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

pub mod recipes;
pub mod recommendations;
pub mod state;
pub mod users;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            // Request ID first so the trace span can pick it up
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(cors),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/search", get(recipes::search))
        .route("/categories", get(recipes::categories))
        .route("/recipes/:recipe_id", get(recipes::get_recipe))
        .route("/recipes/:recipe_id/metrics", get(recipes::metrics))
        .route("/recipes/:recipe_id/views", post(recipes::record_view))
        .route("/recipes/:recipe_id/ratings", post(recipes::rate))
        .route("/users/:username/saved", post(users::save_recipe))
        .route(
            "/users/:username/saved/:recipe_id",
            delete(users::remove_saved_recipe),
        )
        .route(
            "/users/:username/recommendations",
            get(recommendations::recommend),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
