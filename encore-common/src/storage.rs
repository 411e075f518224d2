//! Binary object storage with public URLs
//!
//! Objects live in named buckets; `public_url` gives the address clients
//! fetch them from.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::{Error, Result};

/// Bucket holding profile pictures
pub const AVATAR_BUCKET: &str = "avatars";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `bucket/path`, replacing any previous object
    async fn put(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<()>;

    /// Address the object is served from
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Filesystem-backed object store
///
/// Objects are written to `<root>/<bucket>/<path>` and published under
/// `<public_base_url>/<bucket>/<path>`.
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Directory served as the public storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        validate_key(bucket)?;
        validate_key(path)?;
        Ok(self.root.join(bucket).join(path))
    }
}

/// Reject keys that could escape the bucket directory
fn validate_key(key: &str) -> Result<()> {
    let path = Path::new(key);
    let plain = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid object key: {}", key)))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<()> {
        let target = self.object_path(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let size = bytes.len();
        tokio::fs::write(&target, bytes).await?;
        info!(bucket, path, size, "Stored object");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_writes_under_bucket() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path(), "http://localhost:5781/storage/");

        store
            .put(AVATAR_BUCKET, "user-1.png", vec![1, 2, 3])
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("avatars").join("user-1.png")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
        assert_eq!(
            store.public_url(AVATAR_BUCKET, "user-1.png"),
            "http://localhost:5781/storage/avatars/user-1.png"
        );
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path(), "http://localhost");

        let result = store.put(AVATAR_BUCKET, "../escape.png", vec![0]).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = store.put(AVATAR_BUCKET, "/abs.png", vec![0]).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
