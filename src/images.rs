//! Pluggable image storage.
//!
//! Uploaded catalog images go to an injected [`ImageStore`]; the database
//! only keeps the returned URL and `publicId`. Deleting a replaced image is
//! best-effort: failures are logged and never fail the surrounding update.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores `data` under `folder` and returns where it ended up.
    async fn upload(
        &self,
        data: &[u8],
        folder: &str,
        file_name: &str,
    ) -> anyhow::Result<StoredImage>;

    /// Removes a previously stored image by its `publicId`.
    async fn delete(&self, public_id: &str) -> anyhow::Result<()>;
}

/// Deletes an image, logging instead of surfacing failures.
pub async fn delete_best_effort(store: &dyn ImageStore, public_id: &str) {
    if let Err(err) = store.delete(public_id).await {
        tracing::warn!(public_id, error = %err, "failed to delete stored image");
    }
}

/// Filesystem-backed store serving uploads under `{base_url}/media/`.
pub struct FsImageStore {
    root: PathBuf,
    base_url: String,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn upload(
        &self,
        data: &[u8],
        folder: &str,
        file_name: &str,
    ) -> anyhow::Result<StoredImage> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let name = format!("{}.{ext}", Uuid::new_v4());
        let public_id = format!("{folder}/{name}");

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), data).await?;

        Ok(StoredImage {
            url: format!("{}/media/{public_id}", self.base_url),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
        // publicIds are server-generated; refuse anything that could walk
        // out of the media root.
        if public_id.contains("..") || public_id.starts_with('/') {
            anyhow::bail!("invalid public id: {public_id}");
        }
        tokio::fs::remove_file(self.root.join(public_id)).await?;
        Ok(())
    }
}

/// In-memory stand-in used by the test suite; uploads succeed without
/// touching disk and deletes are no-ops.
#[derive(Default)]
pub struct NullImageStore;

#[async_trait]
impl ImageStore for NullImageStore {
    async fn upload(
        &self,
        _data: &[u8],
        folder: &str,
        _file_name: &str,
    ) -> anyhow::Result<StoredImage> {
        let public_id = format!("{folder}/{}", Uuid::new_v4());
        Ok(StoredImage {
            url: format!("null://{public_id}"),
            public_id,
        })
    }

    async fn delete(&self, _public_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
