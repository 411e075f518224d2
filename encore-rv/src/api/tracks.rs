//! Track search and the track detail view

use axum::{
    extract::{Query, State},
    Json,
};
use encore_common::models::Review;
use encore_common::ratings::{self, RatingAggregate};
use encore_common::track::{Track, TrackExtras};
use serde::{Deserialize, Serialize};

use super::required_text;
use crate::error::{ApiError, ApiResult};
use crate::identity::CurrentUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TrackSearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// GET /api/tracks/search?q=...
pub async fn search_tracks(
    State(state): State<AppState>,
    Query(query): Query<TrackSearchQuery>,
) -> ApiResult<Json<Vec<Track>>> {
    let q = required_text(query.q.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Query required".to_string()))?;
    Ok(Json(state.tracks.search(&q).await?))
}

#[derive(Debug, Deserialize)]
pub struct TrackDetailQuery {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

/// Everything the detail view shows for one track
#[derive(Debug, Serialize)]
pub struct TrackDetail {
    pub title: String,
    pub artist: String,
    pub aggregate: RatingAggregate,
    /// The caller's own review, when they logged this track
    pub user_review: Option<Review>,
    pub reviews: Vec<Review>,
    pub extras: TrackExtras,
}

/// GET /api/tracks/detail?title=...&artist=...
///
/// Title and artist are matched exactly.
pub async fn track_detail(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<TrackDetailQuery>,
) -> ApiResult<Json<TrackDetail>> {
    let (Some(title), Some(artist)) = (query.title, query.artist) else {
        return Err(ApiError::BadRequest(
            "title and artist are required".to_string(),
        ));
    };

    let all = state.store.list_reviews().await?;
    let aggregate = ratings::aggregate(&all, &title, &artist);
    let user_review = user
        .as_ref()
        .and_then(|u| ratings::user_review(&all, &title, &artist, &u.id))
        .cloned();
    let reviews = ratings::reviews_for_track(&all, &title, &artist)
        .cloned()
        .collect();
    let extras = state.tracks.extras(&title, &artist).await;

    Ok(Json(TrackDetail {
        title,
        artist,
        aggregate,
        user_review,
        reviews,
        extras,
    }))
}
