//! Playlists and their items

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use encore_common::models::{Playlist, PlaylistItem, PlaylistItemDraft};
use encore_common::store::Datastore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use super::required_text;
use crate::error::{ApiError, ApiResult};
use crate::identity::CurrentUser;
use crate::AppState;

/// Description used when none is given
pub const DEFAULT_DESCRIPTION: &str = "Custom collection";

/// Cover images shown per playlist tile
pub const MAX_COVERS: usize = 4;

/// A playlist with its items and cover mosaic
#[derive(Debug, Serialize)]
pub struct PlaylistSummary {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub items: Vec<PlaylistItem>,
    /// Artwork of the first items that have any
    pub covers: Vec<String>,
}

fn covers(items: &[PlaylistItem]) -> Vec<String> {
    items
        .iter()
        .filter(|item| !item.album_art_url.is_empty())
        .map(|item| item.album_art_url.clone())
        .take(MAX_COVERS)
        .collect()
}

/// A user's playlists, newest first, with their items
pub(crate) async fn playlist_summaries(
    store: &dyn Datastore,
    user_id: &str,
) -> ApiResult<Vec<PlaylistSummary>> {
    let playlists = store.playlists_by_user(user_id).await?;
    let ids: Vec<String> = playlists.iter().map(|p| p.id.clone()).collect();

    let mut items_by_playlist: HashMap<String, Vec<PlaylistItem>> = HashMap::new();
    for item in store.playlist_items(&ids).await? {
        items_by_playlist
            .entry(item.playlist_id.clone())
            .or_default()
            .push(item);
    }

    Ok(playlists
        .into_iter()
        .map(|playlist| {
            let items = items_by_playlist.remove(&playlist.id).unwrap_or_default();
            PlaylistSummary {
                covers: covers(&items),
                playlist,
                items,
            }
        })
        .collect())
}

/// Load a playlist and make sure the caller owns it
async fn owned_playlist(
    store: &dyn Datastore,
    playlist_id: &str,
    user: &CurrentUser,
) -> ApiResult<Playlist> {
    let playlist = store
        .playlist(playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Playlist not found: {}", playlist_id)))?;
    if playlist.user_id != user.id {
        return Err(ApiError::Forbidden(
            "Only the owner can change this playlist".to_string(),
        ));
    }
    Ok(playlist)
}

/// GET /api/playlists
pub async fn list_playlists(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<PlaylistSummary>>> {
    Ok(Json(playlist_summaries(state.store.as_ref(), &user.id).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewPlaylist {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /api/playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<NewPlaylist>,
) -> ApiResult<(StatusCode, Json<Playlist>)> {
    let title = required_text(body.title.as_deref())
        .ok_or_else(|| ApiError::BadRequest("title is required".to_string()))?;
    let description = required_text(body.description.as_deref())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let playlist = state
        .store
        .create_playlist(&user.id, &title, &description)
        .await?;
    info!(user_id = %user.id, playlist_id = %playlist.id, "Playlist created");
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// GET /api/playlists/:id/items
///
/// Items in the order they were added.
pub async fn list_playlist_items(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> ApiResult<Json<Vec<PlaylistItem>>> {
    if state.store.playlist(&playlist_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Playlist not found: {}",
            playlist_id
        )));
    }
    Ok(Json(state.store.playlist_items(&[playlist_id]).await?))
}

/// POST /api/playlists/:id/items
pub async fn add_playlist_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(playlist_id): Path<String>,
    Json(draft): Json<PlaylistItemDraft>,
) -> ApiResult<(StatusCode, Json<PlaylistItem>)> {
    if required_text(Some(&draft.song_name)).is_none()
        || required_text(Some(&draft.artist_name)).is_none()
    {
        return Err(ApiError::BadRequest(
            "song_name and artist_name are required".to_string(),
        ));
    }
    owned_playlist(state.store.as_ref(), &playlist_id, &user).await?;

    let item = state.store.add_playlist_item(&playlist_id, &draft).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// DELETE /api/playlist-items/:id
pub async fn remove_playlist_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<String>,
) -> ApiResult<StatusCode> {
    let item = state
        .store
        .playlist_item(&item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Playlist item not found: {}", item_id)))?;
    owned_playlist(state.store.as_ref(), &item.playlist_id, &user).await?;

    state.store.remove_playlist_item(&item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
