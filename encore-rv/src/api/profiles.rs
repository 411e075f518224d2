//! People search and profiles

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use encore_common::models::{
    favorite_slots, Favorite, Profile, ProfileUpdate, Review, Reviewer, FAVORITE_SLOTS,
};
use encore_common::storage::AVATAR_BUCKET;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::playlists::{playlist_summaries, PlaylistSummary};
use super::required_text;
use crate::error::{ApiError, ApiResult};
use crate::identity::CurrentUser;
use crate::AppState;

/// Name shown for users who never set one
pub const FALLBACK_PROFILE_NAME: &str = "Curator";

/// Largest accepted avatar upload
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct PeopleQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// GET /api/people?q=...
///
/// Reviewers whose display name contains `q`, ignoring case.
pub async fn search_people(
    State(state): State<AppState>,
    Query(query): Query<PeopleQuery>,
) -> ApiResult<Json<Vec<Reviewer>>> {
    let q = required_text(query.q.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Query required".to_string()))?;
    Ok(Json(state.store.search_reviewers(&q).await?))
}

/// A user's public page
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: String,
    pub user_name: String,
    pub avatar_url: Option<String>,
    pub posts: Vec<Review>,
    pub followers: usize,
    pub following: usize,
    pub playlists: Vec<PlaylistSummary>,
    pub favorites: [Option<Favorite>; FAVORITE_SLOTS],
    /// Whether the caller follows this user
    pub is_following: bool,
    pub is_own_profile: bool,
}

/// GET /api/users/:id/profile
pub async fn get_profile(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    let store = &state.store;

    let profile = store.profile(&user_id).await?;
    let posts = store.reviews_by_users(std::slice::from_ref(&user_id)).await?;
    let followers = store.follower_ids(&user_id).await?;
    let following = store.following_ids(&user_id).await?;
    let playlists = playlist_summaries(store.as_ref(), &user_id).await?;
    let favorites = favorite_slots(store.favorites(&user_id).await?);

    // Stored profile name, else the name they last reviewed under
    let user_name = match profile.as_ref().and_then(|p| p.user_name.clone()) {
        Some(name) => name,
        None => posts
            .first()
            .map(|p| p.user_name.clone())
            .unwrap_or_else(|| FALLBACK_PROFILE_NAME.to_string()),
    };

    let is_own_profile = viewer.as_ref().is_some_and(|v| v.id == user_id);
    let is_following = match &viewer {
        Some(v) if !is_own_profile => followers.contains(&v.id),
        _ => false,
    };

    Ok(Json(ProfileView {
        avatar_url: profile.and_then(|p| p.avatar_url),
        id: user_id,
        user_name,
        posts,
        followers: followers.len(),
        following: following.len(),
        playlists,
        favorites,
        is_following,
        is_own_profile,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ProfileNameUpdate {
    #[serde(default)]
    pub user_name: Option<String>,
}

/// PUT /api/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<ProfileNameUpdate>,
) -> ApiResult<Json<Profile>> {
    let user_name = required_text(body.user_name.as_deref())
        .ok_or_else(|| ApiError::BadRequest("user_name is required".to_string()))?;

    let profile = state
        .store
        .upsert_profile(
            &user.id,
            &ProfileUpdate {
                user_name: Some(user_name),
                avatar_url: None,
            },
        )
        .await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct AvatarQuery {
    #[serde(default)]
    pub ext: Option<String>,
}

/// Lowercased file extension, letters and digits only
fn avatar_extension(ext: Option<&str>) -> Result<String, ApiError> {
    let ext = ext.unwrap_or("png").trim_start_matches('.').to_ascii_lowercase();
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(ext)
    } else {
        Err(ApiError::BadRequest(format!("Unsupported file extension: {}", ext)))
    }
}

/// POST /api/profile/avatar?ext=png
///
/// The body is the raw image. It is stored as `<user>-<random>.<ext>` in the
/// avatars bucket and its public URL becomes the profile picture.
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AvatarQuery>,
    body: Bytes,
) -> ApiResult<Json<Profile>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Image body is empty".to_string()));
    }
    let ext = avatar_extension(query.ext.as_deref())?;
    let path = format!("{}-{}.{}", user.id, Uuid::new_v4(), ext);

    state
        .objects
        .put(AVATAR_BUCKET, &path, body.to_vec())
        .await?;
    let public_url = state.objects.public_url(AVATAR_BUCKET, &path);
    info!(user_id = %user.id, url = %public_url, "Avatar uploaded");

    let profile = state
        .store
        .upsert_profile(
            &user.id,
            &ProfileUpdate {
                user_name: None,
                avatar_url: Some(public_url),
            },
        )
        .await?;
    Ok(Json(profile))
}
