//! SQLite-backed datastore

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{create_schema, Datastore};
use crate::events::{ChangeBus, ChangeEvent, ChangeKind, Table};
use crate::models::{
    Comment, Favorite, FavoriteDraft, Playlist, PlaylistItem, PlaylistItemDraft, Profile,
    ProfileUpdate, Review, ReviewDraft, Reviewer, Upserted,
};
use crate::{Error, Result};

const REVIEW_COLUMNS: &str = "id, user_id, user_name, song_name, artist_name, album_art_url, \
     preview_url, soundcloud_url, rating, caption, created_at";

const PLAYLIST_ITEM_COLUMNS: &str =
    "id, playlist_id, song_name, artist_name, album_art_url, preview_url, added_at";

pub struct SqliteStore {
    pool: SqlitePool,
    changes: ChangeBus,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let newly_created = !path.exists();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", path.display());
        } else {
            info!("Opened existing database: {}", path.display());
        }

        Self::with_pool(pool).await
    }

    /// Private in-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // One connection that never expires, otherwise the database vanishes
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        create_schema(&pool).await?;
        Ok(Self {
            pool,
            changes: ChangeBus::default(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn publish(&self, table: Table, kind: ChangeKind, row_id: impl Into<String>) {
        self.changes.publish(ChangeEvent::new(table, kind, row_id));
    }

    async fn review_row(&self, id: &str) -> Result<Option<Review>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", REVIEW_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn favorite_row(&self, user_id: &str, slot_number: i64) -> Result<Option<Favorite>> {
        let row = sqlx::query(
            "SELECT user_id, slot_number, track_name, artist_name, image_url \
             FROM user_favorites WHERE user_id = ? AND slot_number = ?",
        )
        .bind(user_id)
        .bind(slot_number)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(favorite_from_row).transpose()
    }
}

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically
fn timestamp_column(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let text: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Bad timestamp in {}: {} ({})", column, text, e)))
}

fn review_from_row(row: &SqliteRow) -> Result<Review> {
    Ok(Review {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        song_name: row.try_get("song_name")?,
        artist_name: row.try_get("artist_name")?,
        album_art_url: row.try_get("album_art_url")?,
        preview_url: row.try_get("preview_url")?,
        soundcloud_url: row.try_get("soundcloud_url")?,
        rating: row.try_get("rating")?,
        caption: row.try_get("caption")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

fn favorite_from_row(row: &SqliteRow) -> Result<Favorite> {
    Ok(Favorite {
        user_id: row.try_get("user_id")?,
        slot_number: row.try_get("slot_number")?,
        track_name: row.try_get("track_name")?,
        artist_name: row.try_get("artist_name")?,
        image_url: row.try_get("image_url")?,
    })
}

fn playlist_from_row(row: &SqliteRow) -> Result<Playlist> {
    Ok(Playlist {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

fn playlist_item_from_row(row: &SqliteRow) -> Result<PlaylistItem> {
    Ok(PlaylistItem {
        id: row.try_get("id")?,
        playlist_id: row.try_get("playlist_id")?,
        song_name: row.try_get("song_name")?,
        artist_name: row.try_get("artist_name")?,
        album_art_url: row.try_get("album_art_url")?,
        preview_url: row.try_get("preview_url")?,
        added_at: parse_timestamp(row, "added_at")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        content: row.try_get("content")?,
        created_at: parse_timestamp(row, "created_at")?,
    })
}

fn profile_from_row(row: &SqliteRow) -> Result<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        user_name: row.try_get("user_name")?,
        avatar_url: row.try_get("avatar_url")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

/// Escape LIKE wildcards so the fragment matches literally
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// `<prefix> (?, ?, ...) <suffix>` with every id bound
fn in_list_query<'a>(prefix: &str, ids: &'a [String], suffix: &str) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::new(prefix);
    builder.push(" (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(") ");
    builder.push(suffix);
    builder
}

#[async_trait]
impl Datastore for SqliteStore {
    async fn list_reviews(&self) -> Result<Vec<Review>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts ORDER BY created_at DESC, rowid DESC",
            REVIEW_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(review_from_row).collect()
    }

    async fn reviews_by_users(&self, user_ids: &[String]) -> Result<Vec<Review>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = in_list_query(
            &format!("SELECT {} FROM posts WHERE user_id IN", REVIEW_COLUMNS),
            user_ids,
            "ORDER BY created_at DESC, rowid DESC",
        )
        .build()
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(review_from_row).collect()
    }

    async fn review(&self, id: &str) -> Result<Option<Review>> {
        self.review_row(id).await
    }

    async fn upsert_review(
        &self,
        user_id: &str,
        user_name: &str,
        draft: &ReviewDraft,
    ) -> Result<Upserted<Review>> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM posts WHERE user_id = ? AND song_name = ? AND artist_name = ?",
        )
        .bind(user_id)
        .bind(&draft.song_name)
        .bind(&draft.artist_name)
        .fetch_optional(&mut *tx)
        .await?;

        let updated = existing.is_some();
        let id = existing.unwrap_or_else(|| Uuid::new_v4().to_string());

        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, user_name, song_name, artist_name, album_art_url,
                               preview_url, soundcloud_url, rating, caption, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, song_name, artist_name) DO UPDATE SET
                user_name = excluded.user_name,
                album_art_url = excluded.album_art_url,
                preview_url = excluded.preview_url,
                soundcloud_url = excluded.soundcloud_url,
                rating = excluded.rating,
                caption = excluded.caption
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(user_name)
        .bind(&draft.song_name)
        .bind(&draft.artist_name)
        .bind(&draft.album_art_url)
        .bind(&draft.preview_url)
        .bind(&draft.soundcloud_url)
        .bind(draft.rating)
        .bind(&draft.caption)
        .bind(timestamp_column(Utc::now()))
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", REVIEW_COLUMNS))
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;
        let review = review_from_row(&row)?;

        tx.commit().await?;

        let kind = if updated {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        debug!(review_id = %review.id, updated, "Review saved");
        self.publish(Table::Posts, kind, review.id.clone());

        Ok(Upserted {
            row: review,
            updated,
        })
    }

    async fn search_reviewers(&self, fragment: &str) -> Result<Vec<Reviewer>> {
        let rows = sqlx::query(
            "SELECT user_id, user_name FROM posts WHERE user_name LIKE ? ESCAPE '\\' \
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(like_pattern(fragment))
        .fetch_all(&self.pool)
        .await?;

        let mut seen = HashSet::new();
        let mut reviewers = Vec::new();
        for row in rows {
            let id: String = row.try_get("user_id")?;
            if seen.insert(id.clone()) {
                reviewers.push(Reviewer {
                    id,
                    user_name: row.try_get("user_name")?,
                });
            }
        }
        Ok(reviewers)
    }

    async fn reviewer_names(&self, user_ids: &[String]) -> Result<HashMap<String, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = in_list_query(
            "SELECT user_id, user_name FROM posts WHERE user_id IN",
            user_ids,
            "ORDER BY created_at ASC, rowid ASC",
        )
        .build()
        .fetch_all(&self.pool)
        .await?;

        // Ascending order, so later reviews overwrite earlier names
        let mut names = HashMap::new();
        for row in rows {
            names.insert(row.try_get("user_id")?, row.try_get("user_name")?);
        }
        Ok(names)
    }

    async fn favorites(&self, user_id: &str) -> Result<Vec<Favorite>> {
        let rows = sqlx::query(
            "SELECT user_id, slot_number, track_name, artist_name, image_url \
             FROM user_favorites WHERE user_id = ? ORDER BY slot_number",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(favorite_from_row).collect()
    }

    async fn upsert_favorite(
        &self,
        user_id: &str,
        slot_number: i64,
        draft: &FavoriteDraft,
    ) -> Result<Upserted<Favorite>> {
        let updated = self.favorite_row(user_id, slot_number).await?.is_some();

        sqlx::query(
            r#"
            INSERT INTO user_favorites (user_id, slot_number, track_name, artist_name, image_url, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, slot_number) DO UPDATE SET
                track_name = excluded.track_name,
                artist_name = excluded.artist_name,
                image_url = excluded.image_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(slot_number)
        .bind(&draft.track_name)
        .bind(&draft.artist_name)
        .bind(&draft.image_url)
        .bind(timestamp_column(Utc::now()))
        .execute(&self.pool)
        .await?;

        let favorite = self
            .favorite_row(user_id, slot_number)
            .await?
            .ok_or_else(|| Error::Internal("Favorite missing after upsert".to_string()))?;

        let kind = if updated {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        self.publish(
            Table::UserFavorites,
            kind,
            format!("{}:{}", user_id, slot_number),
        );

        Ok(Upserted {
            row: favorite,
            updated,
        })
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Playlist> {
        let playlist = Playlist {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO playlists (id, user_id, title, description, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&playlist.id)
        .bind(&playlist.user_id)
        .bind(&playlist.title)
        .bind(&playlist.description)
        .bind(timestamp_column(playlist.created_at))
        .execute(&self.pool)
        .await?;

        self.publish(Table::Playlists, ChangeKind::Insert, playlist.id.clone());
        Ok(playlist)
    }

    async fn playlists_by_user(&self, user_id: &str) -> Result<Vec<Playlist>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, description, created_at FROM playlists \
             WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(playlist_from_row).collect()
    }

    async fn playlist(&self, id: &str) -> Result<Option<Playlist>> {
        let row = sqlx::query(
            "SELECT id, user_id, title, description, created_at FROM playlists WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(playlist_from_row).transpose()
    }

    async fn playlist_items(&self, playlist_ids: &[String]) -> Result<Vec<PlaylistItem>> {
        if playlist_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = in_list_query(
            &format!(
                "SELECT {} FROM playlist_items WHERE playlist_id IN",
                PLAYLIST_ITEM_COLUMNS
            ),
            playlist_ids,
            "ORDER BY added_at ASC, rowid ASC",
        )
        .build()
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(playlist_item_from_row).collect()
    }

    async fn playlist_item(&self, id: &str) -> Result<Option<PlaylistItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM playlist_items WHERE id = ?",
            PLAYLIST_ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(playlist_item_from_row).transpose()
    }

    async fn add_playlist_item(
        &self,
        playlist_id: &str,
        draft: &PlaylistItemDraft,
    ) -> Result<PlaylistItem> {
        if self.playlist(playlist_id).await?.is_none() {
            return Err(Error::NotFound(format!("Playlist {}", playlist_id)));
        }

        let item = PlaylistItem {
            id: Uuid::new_v4().to_string(),
            playlist_id: playlist_id.to_string(),
            song_name: draft.song_name.clone(),
            artist_name: draft.artist_name.clone(),
            album_art_url: draft.album_art_url.clone(),
            preview_url: draft.preview_url.clone(),
            added_at: Utc::now(),
        };

        sqlx::query(&format!(
            "INSERT INTO playlist_items ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            PLAYLIST_ITEM_COLUMNS
        ))
        .bind(&item.id)
        .bind(&item.playlist_id)
        .bind(&item.song_name)
        .bind(&item.artist_name)
        .bind(&item.album_art_url)
        .bind(&item.preview_url)
        .bind(timestamp_column(item.added_at))
        .execute(&self.pool)
        .await?;

        self.publish(Table::PlaylistItems, ChangeKind::Insert, item.id.clone());
        Ok(item)
    }

    async fn remove_playlist_item(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM playlist_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.publish(Table::PlaylistItems, ChangeKind::Delete, id);
        }
        Ok(removed)
    }

    async fn follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        if follower_id == following_id {
            return Err(Error::InvalidInput("Users cannot follow themselves".to_string()));
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(following_id)
        .bind(timestamp_column(Utc::now()))
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            self.publish(
                Table::Follows,
                ChangeKind::Insert,
                format!("{}:{}", follower_id, following_id),
            );
        }
        Ok(created)
    }

    async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.publish(
                Table::Follows,
                ChangeKind::Delete,
                format!("{}:{}", follower_id, following_id),
            );
        }
        Ok(removed)
    }

    async fn following_ids(&self, follower_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT following_id FROM follows WHERE follower_id = ? ORDER BY created_at, rowid",
        )
        .bind(follower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn follower_ids(&self, following_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT follower_id FROM follows WHERE following_id = ? ORDER BY created_at, rowid",
        )
        .bind(following_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT id, post_id, user_id, user_name, content, created_at FROM comments \
             WHERE post_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(comment_from_row).collect()
    }

    async fn add_comment(
        &self,
        post_id: &str,
        user_id: &str,
        user_name: &str,
        content: &str,
    ) -> Result<Comment> {
        if self.review_row(post_id).await?.is_none() {
            return Err(Error::NotFound(format!("Review {}", post_id)));
        }

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO comments (id, post_id, user_id, user_name, content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.user_id)
        .bind(&comment.user_name)
        .bind(&comment.content)
        .bind(timestamp_column(comment.created_at))
        .execute(&self.pool)
        .await?;

        self.publish(Table::Comments, ChangeKind::Insert, comment.id.clone());
        Ok(comment)
    }

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let row = sqlx::query("SELECT id, user_name, avatar_url, updated_at FROM profiles WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn upsert_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile> {
        let updated = self.profile(user_id).await?.is_some();

        sqlx::query(
            r#"
            INSERT INTO profiles (id, user_name, avatar_url, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                user_name = COALESCE(excluded.user_name, profiles.user_name),
                avatar_url = COALESCE(excluded.avatar_url, profiles.avatar_url),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&update.user_name)
        .bind(&update.avatar_url)
        .bind(timestamp_column(Utc::now()))
        .execute(&self.pool)
        .await?;

        let profile = self
            .profile(user_id)
            .await?
            .ok_or_else(|| Error::Internal("Profile missing after upsert".to_string()))?;

        let kind = if updated {
            ChangeKind::Update
        } else {
            ChangeKind::Insert
        };
        self.publish(Table::Profiles, kind, user_id);
        Ok(profile)
    }

    fn changes(&self) -> &ChangeBus {
        &self.changes
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Datastore closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventFilter;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;

    fn draft(song: &str, artist: &str, rating: f64) -> ReviewDraft {
        ReviewDraft {
            song_name: song.to_string(),
            artist_name: artist.to_string(),
            rating,
            caption: "on repeat".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_review_upsert_replaces_same_track() {
        let store = SqliteStore::in_memory().await.unwrap();

        let first = store
            .upsert_review("u1", "Ana", &draft("Song", "Artist", 3.0))
            .await
            .unwrap();
        assert!(!first.updated);

        let second = store
            .upsert_review("u1", "Ana", &draft("Song", "Artist", 4.5))
            .await
            .unwrap();
        assert!(second.updated);
        assert_eq!(second.row.id, first.row.id);
        assert_eq!(second.row.created_at, first.row.created_at);
        assert_eq!(second.row.rating, 4.5);

        let all = store.list_reviews().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_reviews_newest_first_and_filtered_by_user() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.upsert_review("u1", "Ana", &draft("A", "X", 3.0)).await.unwrap();
        store.upsert_review("u2", "Ben", &draft("B", "X", 4.0)).await.unwrap();
        store.upsert_review("u3", "Cy", &draft("C", "X", 5.0)).await.unwrap();

        let all = store.list_reviews().await.unwrap();
        let songs: Vec<_> = all.iter().map(|r| r.song_name.as_str()).collect();
        assert_eq!(songs, vec!["C", "B", "A"]);

        let some = store
            .reviews_by_users(&["u1".to_string(), "u3".to_string()])
            .await
            .unwrap();
        let songs: Vec<_> = some.iter().map(|r| r.song_name.as_str()).collect();
        assert_eq!(songs, vec!["C", "A"]);

        assert!(store.reviews_by_users(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reviewer_search_is_case_insensitive_and_distinct() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.upsert_review("u1", "Anabel", &draft("A", "X", 3.0)).await.unwrap();
        store.upsert_review("u1", "Anabel", &draft("B", "X", 3.0)).await.unwrap();
        store.upsert_review("u2", "Hannah", &draft("C", "X", 3.0)).await.unwrap();
        store.upsert_review("u3", "Bob", &draft("D", "X", 3.0)).await.unwrap();

        let found = store.search_reviewers("ANA").await.unwrap();
        let mut ids: Vec<_> = found.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["u1"]);

        let found = store.search_reviewers("an").await.unwrap();
        assert_eq!(found.len(), 2);

        // Wildcards match literally
        assert!(store.search_reviewers("%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorite_slot_upsert() {
        let store = SqliteStore::in_memory().await.unwrap();
        let fav = |name: &str| FavoriteDraft {
            track_name: name.to_string(),
            artist_name: "Artist".to_string(),
            image_url: String::new(),
        };

        let first = store.upsert_favorite("u1", 2, &fav("One")).await.unwrap();
        assert!(!first.updated);
        let second = store.upsert_favorite("u1", 2, &fav("Two")).await.unwrap();
        assert!(second.updated);

        let favorites = store.favorites("u1").await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].track_name, "Two");
        assert_eq!(favorites[0].slot_number, 2);
    }

    #[tokio::test]
    async fn test_playlist_items_lifecycle() {
        let store = SqliteStore::in_memory().await.unwrap();
        let playlist = store.create_playlist("u1", "Road trip", "Custom collection").await.unwrap();

        let item = store
            .add_playlist_item(
                &playlist.id,
                &PlaylistItemDraft {
                    song_name: "Song".to_string(),
                    artist_name: "Artist".to_string(),
                    album_art_url: "cover.jpg".to_string(),
                    preview_url: None,
                },
            )
            .await
            .unwrap();

        let items = store.playlist_items(&[playlist.id.clone()]).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, item.id);

        assert!(store.remove_playlist_item(&item.id).await.unwrap());
        assert!(!store.remove_playlist_item(&item.id).await.unwrap());
        assert!(store.playlist_items(&[playlist.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_item_to_unknown_playlist() {
        let store = SqliteStore::in_memory().await.unwrap();
        let result = store
            .add_playlist_item(
                "missing",
                &PlaylistItemDraft {
                    song_name: "S".to_string(),
                    artist_name: "A".to_string(),
                    album_art_url: String::new(),
                    preview_url: None,
                },
            )
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_follow_unfollow() {
        let store = SqliteStore::in_memory().await.unwrap();

        assert!(store.follow("u1", "u2").await.unwrap());
        assert!(!store.follow("u1", "u2").await.unwrap());
        assert!(matches!(
            store.follow("u1", "u1").await,
            Err(Error::InvalidInput(_))
        ));

        assert_eq!(store.following_ids("u1").await.unwrap(), vec!["u2".to_string()]);
        assert_eq!(store.follower_ids("u2").await.unwrap(), vec!["u1".to_string()]);

        assert!(store.unfollow("u1", "u2").await.unwrap());
        assert!(store.following_ids("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comments_require_existing_review() {
        let store = SqliteStore::in_memory().await.unwrap();
        let review = store
            .upsert_review("u1", "Ana", &draft("Song", "Artist", 4.0))
            .await
            .unwrap()
            .row;

        store.add_comment(&review.id, "u2", "Ben", "first").await.unwrap();
        store.add_comment(&review.id, "u3", "Cy", "second").await.unwrap();

        let comments = store.comments(&review.id).await.unwrap();
        let contents: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);

        let missing = store.add_comment("nope", "u2", "Ben", "x").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_profile_partial_update_keeps_fields() {
        let store = SqliteStore::in_memory().await.unwrap();

        store
            .upsert_profile(
                "u1",
                &ProfileUpdate {
                    user_name: Some("Ana".to_string()),
                    avatar_url: None,
                },
            )
            .await
            .unwrap();
        let profile = store
            .upsert_profile(
                "u1",
                &ProfileUpdate {
                    user_name: None,
                    avatar_url: Some("http://x/avatars/u1.png".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.user_name.as_deref(), Some("Ana"));
        assert_eq!(profile.avatar_url.as_deref(), Some("http://x/avatars/u1.png"));
    }

    #[tokio::test]
    async fn test_writes_publish_changes() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut sub = store.changes().subscribe(Table::Posts, EventFilter::All);

        let saved = store
            .upsert_review("u1", "Ana", &draft("Song", "Artist", 4.0))
            .await
            .unwrap();
        store
            .upsert_review("u1", "Ana", &draft("Song", "Artist", 2.0))
            .await
            .unwrap();

        let first = timeout(Duration::from_secs(1), sub.recv()).await.unwrap().unwrap();
        assert_eq!(first.kind, ChangeKind::Insert);
        assert_eq!(first.row_id, saved.row.id);

        let second = timeout(Duration::from_secs(1), sub.recv()).await.unwrap().unwrap();
        assert_eq!(second.kind, ChangeKind::Update);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("encore.db");

        let store = SqliteStore::open(&path).await.unwrap();
        store.upsert_review("u1", "Ana", &draft("Song", "Artist", 4.0)).await.unwrap();
        store.close().await;

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_reviews().await.unwrap().len(), 1);
        reopened.close().await;
    }
}
