//! Unified track search
//!
//! GET /api/search?q=<text or link>

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::AppState;

/// Cache policy for successful searches
pub const CACHE_CONTROL: &str = "s-maxage=3600, stale-while-revalidate";

/// Query parameters for search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// GET /api/search?q=...
///
/// Social-audio links resolve to a single synthetic result; any other query
/// returns the catalog response as-is.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, SearchError> {
    let q = query
        .q
        .filter(|q| !q.is_empty())
        .ok_or(SearchError::QueryRequired)?;

    let outcome = state.normalizer.search(&q).await.map_err(|e| {
        error!(query = %q, error = %e, "Search failed");
        SearchError::Upstream
    })?;

    let mut response = Json(outcome.into_body()).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL),
    );
    Ok(response)
}

/// OPTIONS /api/search
///
/// Preflight: 200 with an empty body; the CORS layer adds the headers.
pub async fn search_preflight() -> StatusCode {
    StatusCode::OK
}

/// Search errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Query required")]
    QueryRequired,

    /// Cause is logged, never returned
    #[error("Internal Server Error")]
    Upstream,
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = match self {
            SearchError::QueryRequired => StatusCode::BAD_REQUEST,
            SearchError::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
