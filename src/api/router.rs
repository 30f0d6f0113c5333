use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::feed::FeedSource;
use crate::query::QueryEngine;

pub fn create_router<S: FeedSource>(engine: QueryEngine<S>) -> Router {
    Router::new()
        // Tool endpoints
        .route("/tools/latest", post(handlers::latest::<S>))
        .route("/tools/search", post(handlers::search::<S>))
        .route("/tools/get", post(handlers::get_item::<S>))
        .route("/tools/categories", post(handlers::categories::<S>))
        // Service endpoints
        .route("/health", get(handlers::health::<S>))
        .route("/manifest", get(handlers::manifest))
        .with_state(engine)
}
