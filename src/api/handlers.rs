use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use super::models::{
    bounded_count, ApiError, CategoriesResponse, GetParams, HealthResponse, ItemResponse,
    ItemsResponse, LatestParams, SearchParams,
};
use crate::feed::FeedSource;
use crate::query::QueryEngine;

pub const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Most recent press releases, newest first
pub async fn latest<S: FeedSource>(
    State(engine): State<QueryEngine<S>>,
    Json(params): Json<LatestParams>,
) -> Response {
    let n = match bounded_count("n", params.n) {
        Ok(n) => n,
        Err(e) => return e.into_response(),
    };

    match engine.latest(n).await {
        Ok(items) => {
            tracing::info!(count = items.len(), "Returned latest items");
            Json(ItemsResponse::from_items(&items)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch latest items");
            ApiError::Internal.into_response()
        }
    }
}

/// Ranked search over title, categories and description
pub async fn search<S: FeedSource>(
    State(engine): State<QueryEngine<S>>,
    Json(params): Json<SearchParams>,
) -> Response {
    let limit = match bounded_count("limit", params.limit) {
        Ok(limit) => limit,
        Err(e) => return e.into_response(),
    };

    match engine.search(&params.query, limit).await {
        Ok(items) => {
            tracing::info!(query = %params.query, count = items.len(), "Search completed");
            Json(ItemsResponse::from_items(&items)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, query = %params.query, "Search failed");
            ApiError::Internal.into_response()
        }
    }
}

/// Single press release by id
pub async fn get_item<S: FeedSource>(
    State(engine): State<QueryEngine<S>>,
    Json(params): Json<GetParams>,
) -> Response {
    match engine.get_by_id(&params.id).await {
        Ok(Some(item)) => {
            tracing::info!(id = %params.id, "Retrieved item");
            Json(ItemResponse::from(&item)).into_response()
        }
        Ok(None) => ApiError::NotFound.into_response(),
        Err(e) => {
            tracing::error!(error = %e, id = %params.id, "Failed to fetch item");
            ApiError::Internal.into_response()
        }
    }
}

/// All categories, sorted
pub async fn categories<S: FeedSource>(State(engine): State<QueryEngine<S>>) -> Response {
    match engine.list_categories().await {
        Ok(categories) => {
            tracing::info!(count = categories.len(), "Returned categories");
            Json(CategoriesResponse { categories }).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch categories");
            ApiError::Internal.into_response()
        }
    }
}

/// Healthy while a snapshot, fresh or stale, can be served.
pub async fn health<S: FeedSource>(State(engine): State<QueryEngine<S>>) -> Response {
    match engine.store().ensure_fresh().await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                service: SERVICE_NAME.to_string(),
                version: SERVICE_VERSION.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            ApiError::Unavailable.into_response()
        }
    }
}

pub async fn manifest() -> Json<Value> {
    Json(tool_manifest())
}

/// Tool descriptions with JSON-schema parameters.
pub fn tool_manifest() -> Value {
    json!({
        "name": "koeln.presse",
        "version": SERVICE_VERSION,
        "description": "Pressemitteilungen Stadt Köln (RSS) als Tools",
        "tools": {
            "koeln.presse.latest": {
                "description": "Neueste Pressemitteilungen",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "n": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": 100,
                            "default": 10,
                            "description": "Anzahl der zurückzugebenden Items"
                        }
                    },
                    "required": []
                }
            },
            "koeln.presse.search": {
                "description": "Pressemitteilungen durchsuchen",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Suchbegriff"
                        },
                        "limit": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": 100,
                            "default": 20,
                            "description": "Maximale Anzahl Ergebnisse"
                        }
                    },
                    "required": ["query"]
                }
            },
            "koeln.presse.get": {
                "description": "Einzelnes Item per ID",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "string",
                            "description": "Press Item ID"
                        }
                    },
                    "required": ["id"]
                }
            },
            "koeln.presse.categories": {
                "description": "Alle Kategorien",
                "parameters": {
                    "type": "object",
                    "properties": {},
                    "required": []
                }
            }
        }
    })
}
