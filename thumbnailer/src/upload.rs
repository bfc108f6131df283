//! Uploaded images staged on disk

use std::path::Path;

use axum::body::Bytes;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// Raw bytes of an uploaded image, written to a temp file
///
/// The file is deleted when this value is dropped, so an upload never outlives the
/// job that consumes it.
#[derive(Debug)]
pub struct UploadedImage {
    path: TempPath,
}

impl UploadedImage {
    /// Writes `body` to a fresh temp file in `temp_dir`, releasing the buffer afterwards
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be created or written
    pub async fn persist(body: Bytes, temp_dir: &Path) -> std::io::Result<Self> {
        let (file, path) = tempfile::Builder::new()
            .prefix("upload")
            .suffix(".img")
            .tempfile_in(temp_dir)?
            .into_parts();

        let mut file = tokio::fs::File::from_std(file);
        file.write_all(&body).await?;
        file.flush().await?;

        Ok(Self { path })
    }

    /// Returns the location of the staged upload
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
