//! Datastore contract and its SQLite implementation
//!
//! Services hold the datastore as an injected `Arc<dyn Datastore>` created at
//! startup and closed on shutdown. Writes that carry a declared conflict
//! target are upserts:
//! - reviews: `(user_id, song_name, artist_name)`
//! - favorites: `(user_id, slot_number)`
//! - profiles: `id`
//!
//! Every committed write publishes a change event on [`Datastore::changes`].

use async_trait::async_trait;
use std::collections::HashMap;

use crate::events::ChangeBus;
use crate::models::{
    Comment, Favorite, FavoriteDraft, Playlist, PlaylistItem, PlaylistItemDraft, Profile,
    ProfileUpdate, Review, ReviewDraft, Reviewer, Upserted,
};
use crate::Result;

mod schema;
mod sqlite;

pub use schema::create_schema;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait Datastore: Send + Sync {
    // --- reviews (table `posts`) ---

    /// All reviews, newest first
    async fn list_reviews(&self) -> Result<Vec<Review>>;

    /// Reviews written by any of `user_ids`, newest first
    async fn reviews_by_users(&self, user_ids: &[String]) -> Result<Vec<Review>>;

    async fn review(&self, id: &str) -> Result<Option<Review>>;

    /// Insert or replace the caller's review of a track
    ///
    /// A replaced review keeps its id and `created_at`.
    async fn upsert_review(
        &self,
        user_id: &str,
        user_name: &str,
        draft: &ReviewDraft,
    ) -> Result<Upserted<Review>>;

    /// Distinct reviewers whose display name contains `fragment` (case-insensitive)
    async fn search_reviewers(&self, fragment: &str) -> Result<Vec<Reviewer>>;

    /// Latest display name each user reviewed under
    async fn reviewer_names(&self, user_ids: &[String]) -> Result<HashMap<String, String>>;

    // --- favorites (table `user_favorites`) ---

    async fn favorites(&self, user_id: &str) -> Result<Vec<Favorite>>;

    async fn upsert_favorite(
        &self,
        user_id: &str,
        slot_number: i64,
        draft: &FavoriteDraft,
    ) -> Result<Upserted<Favorite>>;

    // --- playlists ---

    async fn create_playlist(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Playlist>;

    /// A user's playlists, newest first
    async fn playlists_by_user(&self, user_id: &str) -> Result<Vec<Playlist>>;

    async fn playlist(&self, id: &str) -> Result<Option<Playlist>>;

    /// Items of the given playlists, oldest first
    async fn playlist_items(&self, playlist_ids: &[String]) -> Result<Vec<PlaylistItem>>;

    async fn playlist_item(&self, id: &str) -> Result<Option<PlaylistItem>>;

    async fn add_playlist_item(
        &self,
        playlist_id: &str,
        draft: &PlaylistItemDraft,
    ) -> Result<PlaylistItem>;

    /// Returns false when no such item existed
    async fn remove_playlist_item(&self, id: &str) -> Result<bool>;

    // --- follows ---

    /// Returns false when the follow already existed
    async fn follow(&self, follower_id: &str, following_id: &str) -> Result<bool>;

    /// Returns false when there was nothing to remove
    async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<bool>;

    /// Users `follower_id` follows
    async fn following_ids(&self, follower_id: &str) -> Result<Vec<String>>;

    /// Users following `following_id`
    async fn follower_ids(&self, following_id: &str) -> Result<Vec<String>>;

    // --- comments ---

    /// Comments under a review, oldest first
    async fn comments(&self, post_id: &str) -> Result<Vec<Comment>>;

    async fn add_comment(
        &self,
        post_id: &str,
        user_id: &str,
        user_name: &str,
        content: &str,
    ) -> Result<Comment>;

    // --- profiles ---

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Write the supplied fields, keeping stored values for the rest
    async fn upsert_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile>;

    // --- lifecycle ---

    /// Change notifications for committed writes
    fn changes(&self) -> &ChangeBus;

    /// Release connections; called once during shutdown
    async fn close(&self);
}
