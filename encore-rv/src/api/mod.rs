//! HTTP API handlers for encore-rv

pub mod events;
pub mod favorites;
pub mod follows;
pub mod playlists;
pub mod posts;
pub mod profiles;
pub mod tracks;

pub use events::event_stream;
pub use favorites::{get_favorites, set_favorite};
pub use follows::{follow_user, list_followers, list_following, unfollow_user};
pub use playlists::{
    add_playlist_item, create_playlist, list_playlist_items, list_playlists, remove_playlist_item,
};
pub use posts::{add_comment, feed, list_comments, list_posts, upsert_post};
pub use profiles::{get_profile, search_people, update_profile, upload_avatar, MAX_AVATAR_BYTES};
pub use tracks::{search_tracks, track_detail};

/// Trimmed, non-empty text
pub(crate) fn required_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
