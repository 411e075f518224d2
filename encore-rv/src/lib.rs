//! encore-rv library - review service
//!
//! Reviews, ratings, follows, favorites, playlists, comments and profiles
//! over an injected [`Datastore`], plus a realtime change stream.

use axum::Router;
use encore_common::health::health_routes;
use encore_common::storage::ObjectStore;
use encore_common::store::Datastore;
use std::sync::Arc;

pub mod api;
pub mod catalog;
pub mod error;
pub mod identity;

use catalog::TrackLookup;

/// Module name reported by `/health`
pub const MODULE_NAME: &str = "encore-rv";

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub objects: Arc<dyn ObjectStore>,
    pub tracks: Arc<TrackLookup>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Datastore>,
        objects: Arc<dyn ObjectStore>,
        tracks: TrackLookup,
    ) -> Self {
        Self {
            store,
            objects,
            tracks: Arc::new(tracks),
        }
    }
}

/// Build application router
///
/// Static serving of stored objects is mounted by the binary, which knows
/// where they live on disk.
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::routing::{delete, get, post, put};
    use tower_http::trace::TraceLayer;

    Router::new()
        // Reviews
        .route("/api/posts", get(api::list_posts).put(api::upsert_post))
        .route("/api/feed", get(api::feed))
        .route(
            "/api/posts/:id/comments",
            get(api::list_comments).post(api::add_comment),
        )
        // Tracks
        .route("/api/tracks/search", get(api::search_tracks))
        .route("/api/tracks/detail", get(api::track_detail))
        // People and profiles
        .route("/api/people", get(api::search_people))
        .route("/api/users/:id/profile", get(api::get_profile))
        .route("/api/users/:id/followers", get(api::list_followers))
        .route("/api/users/:id/following", get(api::list_following))
        .route("/api/profile", put(api::update_profile))
        .route(
            "/api/profile/avatar",
            post(api::upload_avatar).layer(DefaultBodyLimit::max(api::MAX_AVATAR_BYTES)),
        )
        .route(
            "/api/follows/:id",
            post(api::follow_user).delete(api::unfollow_user),
        )
        // Favorites
        // GET takes a user id, PUT one of the caller's slot numbers
        .route(
            "/api/favorites/:key",
            get(api::get_favorites).put(api::set_favorite),
        )
        // Playlists
        .route(
            "/api/playlists",
            get(api::list_playlists).post(api::create_playlist),
        )
        .route(
            "/api/playlists/:id/items",
            get(api::list_playlist_items).post(api::add_playlist_item),
        )
        .route("/api/playlist-items/:id", delete(api::remove_playlist_item))
        // Realtime
        .route("/api/events", get(api::event_stream))
        .merge(health_routes(MODULE_NAME, env!("CARGO_PKG_VERSION")))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
