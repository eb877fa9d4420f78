//! HTTP route definitions.

mod documents;
mod health;

use crate::AppState;
use axum::{
    http::{header, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(documents::routes())
}

/// The routes with request tracing and the CORS policy browsers need to read
/// and patch documents.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PATCH])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    create_routes()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
