use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::feed::PressItem;

pub const MIN_COUNT: i64 = 1;
pub const MAX_COUNT: i64 = 100;

fn default_latest_n() -> i64 {
    10
}

fn default_search_limit() -> i64 {
    20
}

/// Body of `POST /tools/latest`
#[derive(Debug, Deserialize)]
pub struct LatestParams {
    #[serde(default = "default_latest_n")]
    pub n: i64,
}

/// Body of `POST /tools/search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

/// Body of `POST /tools/get`
#[derive(Debug, Deserialize)]
pub struct GetParams {
    pub id: String,
}

/// Checks that a count parameter lies in `1..=100`.
pub fn bounded_count(name: &'static str, value: i64) -> Result<usize, ApiError> {
    if (MIN_COUNT..=MAX_COUNT).contains(&value) {
        usize::try_from(value).map_err(|_| ApiError::InvalidParams(name))
    } else {
        Err(ApiError::InvalidParams(name))
    }
}

/// Wire representation of a [`PressItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    /// RFC 3339, offset preserved from the feed.
    pub published_at: String,
    pub categories: Vec<String>,
    pub source: String,
}

impl From<&PressItem> for ItemResponse {
    fn from(item: &PressItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            link: item.link.clone(),
            description: item.description.clone(),
            published_at: item.published_at.to_rfc3339(),
            categories: item.categories.clone(),
            source: item.source.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsResponse {
    pub items: Vec<ItemResponse>,
}

impl ItemsResponse {
    pub fn from_items(items: &[PressItem]) -> Self {
        Self {
            items: items.iter().map(ItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Failure responses of the tool endpoints.
///
/// Messages are fixed; the underlying cause is logged by the handler and
/// never sent to the client.
#[derive(Debug)]
pub enum ApiError {
    /// Named parameter out of range.
    InvalidParams(&'static str),
    NotFound,
    Unavailable,
    Internal,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::InvalidParams(name) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_params",
                format!("{name} must be between {MIN_COUNT} and {MAX_COUNT}"),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "Press item not found".to_string(),
            ),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "Service unhealthy".to_string(),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
