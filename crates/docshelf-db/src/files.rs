//! Upload directory storage backend.
//!
//! Stored names are UUID-derived bare file names; the backend refuses
//! anything containing a path separator or parent-directory sequence, so
//! no caller can escape the base directory.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use docshelf_core::{Error, Result};

/// Storage backend trait for different storage implementations.
///
/// Allows abstracting over the local filesystem or other providers.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data under the given bare file name.
    async fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Read the file with the given bare file name.
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Delete the file with the given bare file name.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Check whether a file with the given bare file name exists.
    async fn exists(&self, name: &str) -> Result<bool>;
}

fn ensure_bare_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(Error::InvalidInput(format!(
            "Stored file name must be a bare name: {:?}",
            name
        )));
    }
    Ok(())
}

/// Filesystem storage backend rooted at the upload directory.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// The base directory for stored files.
    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    fn full_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Validate that the backend can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (permission errors, missing directories, overlayfs quirks) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_file = self.base_path.join(".health-check");

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.base_path, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        ensure_bare_name(name)?;
        let full_path = self.full_path(name);
        debug!(
            subsystem = "storage",
            component = "filesystem",
            op = "write",
            file = %full_path.display(),
            size = data.len(),
            "Writing stored file"
        );

        fs::create_dir_all(&self.base_path).await?;

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "File::create failed");
            e
        })?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await?;
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        ensure_bare_name(name)?;
        Ok(fs::read(self.full_path(name)).await?)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        ensure_bare_name(name)?;
        fs::remove_file(self.full_path(name)).await?;
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        ensure_bare_name(name)?;
        Ok(fs::try_exists(self.full_path(name)).await?)
    }
}
