// ABOUTME: Filesystem-backed object storage for signature images and assembled documents
// ABOUTME: Blobs are addressed by URL under /artifacts/ and served by the web layer

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{AppError, Result};

const PUBLIC_PREFIX: &str = "/artifacts/";

/// Durable blob storage. Uploading the same path again replaces the
/// previous artifact; callers that change paths remove the old blob.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store `bytes` under `path` and return the public, retrievable URL.
    pub async fn upload(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageWriteFailed(e.to_string()))?;
        }
        fs::write(&target, bytes)
            .await
            .map_err(|e| AppError::StorageWriteFailed(e.to_string()))?;
        Ok(format!("{}{}", PUBLIC_PREFIX, path))
    }

    /// Fetch the bytes behind a previously returned URL.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let path = url
            .strip_prefix(PUBLIC_PREFIX)
            .ok_or_else(|| AppError::NotFound(format!("not an artifact url: {}", url)))?;
        self.read(path).await
    }

    /// Delete the blob behind a previously returned URL. Deleting a blob
    /// that is already gone is not an error.
    pub async fn remove(&self, url: &str) -> Result<()> {
        let path = url
            .strip_prefix(PUBLIC_PREFIX)
            .ok_or_else(|| AppError::NotFound(format!("not an artifact url: {}", url)))?;
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageWriteFailed(e.to_string())),
        }
    }

    /// Fetch by bare storage path (used by the serving route).
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        fs::read(&target)
            .await
            .map_err(|_| AppError::NotFound(format!("artifact {}", path)))
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        // Artifact paths are server-generated, but the serving route is
        // public, so traversal segments are still refused.
        if path.is_empty() || Path::new(path).components().any(|c| {
            matches!(c, std::path::Component::ParentDir | std::path::Component::RootDir)
        }) {
            return Err(AppError::BadRequest("invalid artifact path".to_string()));
        }
        Ok(self.root.join(path))
    }
}
