//! "Top four" favorite tracks

use axum::{
    extract::{Path, State},
    Json,
};
use encore_common::models::{
    favorite_slots, Favorite, FavoriteDraft, Upserted, FAVORITE_SLOTS,
};

use super::required_text;
use crate::error::{ApiError, ApiResult};
use crate::identity::CurrentUser;
use crate::AppState;

/// GET /api/favorites/:user
///
/// Always four entries; empty slots are null.
pub async fn get_favorites(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<[Option<Favorite>; FAVORITE_SLOTS]>> {
    let favorites = state.store.favorites(&user_id).await?;
    Ok(Json(favorite_slots(favorites)))
}

fn parse_slot(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(slot) if (0..FAVORITE_SLOTS as i64).contains(&slot) => Ok(slot),
        _ => Err(ApiError::BadRequest(format!(
            "slot must be between 0 and {}, got {}",
            FAVORITE_SLOTS - 1,
            raw
        ))),
    }
}

/// PUT /api/favorites/:slot
///
/// Puts a track in one of the caller's slots, replacing what was there.
pub async fn set_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(slot): Path<String>,
    Json(draft): Json<FavoriteDraft>,
) -> ApiResult<Json<Upserted<Favorite>>> {
    let slot = parse_slot(&slot)?;
    if required_text(Some(&draft.track_name)).is_none() {
        return Err(ApiError::BadRequest("track_name is required".to_string()));
    }

    let saved = state.store.upsert_favorite(&user.id, slot, &draft).await?;
    Ok(Json(saved))
}
