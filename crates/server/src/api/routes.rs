use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::{handlers, torrents};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/torrents", get(torrents::list_torrents))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
