//! Reviews, the following feed and comments

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use encore_common::models::{Comment, Review, ReviewDraft, Upserted};
use serde::Deserialize;
use tracing::info;

use super::required_text;
use crate::error::{ApiError, ApiResult};
use crate::identity::CurrentUser;
use crate::AppState;

/// GET /api/posts
///
/// Every review, newest first.
pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.store.list_reviews().await?))
}

/// GET /api/feed
///
/// Reviews by the users the caller follows, newest first.
pub async fn feed(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Review>>> {
    let following = state.store.following_ids(&user.id).await?;
    Ok(Json(state.store.reviews_by_users(&following).await?))
}

/// PUT /api/posts
///
/// Logs the caller's review of a track, replacing an earlier review of the
/// same track.
pub async fn upsert_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<ReviewDraft>,
) -> ApiResult<Json<Upserted<Review>>> {
    draft.validate().map_err(ApiError::BadRequest)?;

    let saved = state.store.upsert_review(&user.id, &user.name, &draft).await?;
    info!(
        user_id = %user.id,
        song = %saved.row.song_name,
        rating = saved.row.rating,
        updated = saved.updated,
        "Review logged"
    );
    Ok(Json(saved))
}

/// GET /api/posts/:id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    if state.store.review(&post_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Review not found: {}", post_id)));
    }
    Ok(Json(state.store.comments(&post_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub content: Option<String>,
}

/// POST /api/posts/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    Json(body): Json<NewComment>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let content = required_text(body.content.as_deref())
        .ok_or_else(|| ApiError::BadRequest("content is required".to_string()))?;

    let comment = state
        .store
        .add_comment(&post_id, &user.id, &user.name, &content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
