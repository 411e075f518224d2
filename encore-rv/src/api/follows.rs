//! Follow relationships

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::identity::CurrentUser;
use crate::AppState;

/// Name shown in follow lists for users without reviews
pub const UNKNOWN_NAME: &str = "Unknown Curator";

/// One row of a followers/following list
#[derive(Debug, Serialize)]
pub struct FollowEntry {
    pub id: String,
    pub user_name: String,
    /// Whether the caller follows this user
    pub is_following: bool,
}

async fn follow_entries(
    state: &AppState,
    ids: Vec<String>,
    viewer: Option<&CurrentUser>,
) -> ApiResult<Vec<FollowEntry>> {
    let names = state.store.reviewer_names(&ids).await?;
    let viewer_follows: HashSet<String> = match viewer {
        Some(v) => state.store.following_ids(&v.id).await?.into_iter().collect(),
        None => HashSet::new(),
    };

    Ok(ids
        .into_iter()
        .map(|id| FollowEntry {
            user_name: names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            is_following: viewer_follows.contains(&id),
            id,
        })
        .collect())
}

/// GET /api/users/:id/followers
pub async fn list_followers(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<FollowEntry>>> {
    let ids = state.store.follower_ids(&user_id).await?;
    Ok(Json(follow_entries(&state, ids, viewer.as_ref()).await?))
}

/// GET /api/users/:id/following
pub async fn list_following(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<FollowEntry>>> {
    let ids = state.store.following_ids(&user_id).await?;
    Ok(Json(follow_entries(&state, ids, viewer.as_ref()).await?))
}

/// POST /api/follows/:id
pub async fn follow_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(target): Path<String>,
) -> ApiResult<Json<Value>> {
    if target == user.id {
        return Err(ApiError::BadRequest("You cannot follow yourself".to_string()));
    }
    let created = state.store.follow(&user.id, &target).await?;
    if created {
        info!(follower = %user.id, following = %target, "Follow added");
    }
    Ok(Json(json!({ "following": true, "created": created })))
}

/// DELETE /api/follows/:id
pub async fn unfollow_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(target): Path<String>,
) -> ApiResult<Json<Value>> {
    let removed = state.store.unfollow(&user.id, &target).await?;
    Ok(Json(json!({ "following": false, "removed": removed })))
}
