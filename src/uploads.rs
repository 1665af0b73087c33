//! Blob storage for article images and videos.
//!
//! Uploads happen before an article write. [`upload_batch`] either returns a
//! URL for every file or the first error, so a failed batch never leaves a
//! partial media list behind.

use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::content::{media_kind_for_extension, MediaKind};

/// Largest accepted upload (50 MB)
const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0} is not an image")]
    NotAnImage(String),
    #[error("{0} is not a supported image or video type")]
    UnsupportedType(String),
    #[error("{0} is empty")]
    Empty(String),
    #[error("{name} exceeds the {limit} byte upload limit")]
    TooLarge { name: String, limit: usize },
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file selected for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its final path component as the name
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }

    /// Lowercased extension of the file name
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(str::to_ascii_lowercase)
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        media_kind_for_extension(&self.extension()?)
    }
}

/// Stores a file and returns the public URL it can be fetched from
pub trait BlobStore {
    fn upload(&self, file: &UploadFile) -> impl Future<Output = Result<String, UploadError>> + Send;
}

// ============================================================================
// Filesystem store
// ============================================================================

/// Writes uploads into a directory served at `public_base_url`.
///
/// Files are named `{uuid}-{unix_millis}.{ext}`, so names never collide and
/// never contain user-supplied text.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl BlobStore for LocalBlobStore {
    async fn upload(&self, file: &UploadFile) -> Result<String, UploadError> {
        check_uploadable(file)?;
        let ext = file
            .extension()
            .ok_or_else(|| UploadError::UnsupportedType(file.file_name.clone()))?;

        let name = format!(
            "{}-{}.{}",
            uuid::Uuid::new_v4(),
            chrono::Utc::now().timestamp_millis(),
            ext
        );

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&name), &file.bytes).await?;

        tracing::info!(
            file = %file.file_name,
            stored_as = %name,
            bytes = file.bytes.len(),
            "Upload stored"
        );
        Ok(format!("{}/{}", self.public_base_url, name))
    }
}

/// Size and type checks shared by every slot
fn check_uploadable(file: &UploadFile) -> Result<(), UploadError> {
    if file.bytes.is_empty() {
        return Err(UploadError::Empty(file.file_name.clone()));
    }
    if file.bytes.len() > MAX_UPLOAD_SIZE {
        return Err(UploadError::TooLarge {
            name: file.file_name.clone(),
            limit: MAX_UPLOAD_SIZE,
        });
    }
    if file.media_kind().is_none() {
        return Err(UploadError::UnsupportedType(file.file_name.clone()));
    }
    Ok(())
}

// ============================================================================
// Slots
// ============================================================================

/// Upload a file into an image-only slot (the article's primary image)
pub async fn upload_image<B: BlobStore>(store: &B, file: &UploadFile) -> Result<String, UploadError> {
    if file.media_kind() != Some(MediaKind::Image) {
        return Err(UploadError::NotAnImage(file.file_name.clone()));
    }
    store.upload(file).await
}

/// Upload every file, returning URLs in input order, or the first failure.
///
/// Nothing is retried, and files already stored for a failed batch are left
/// in place.
pub async fn upload_batch<B: BlobStore>(
    store: &B,
    files: &[UploadFile],
) -> Result<Vec<String>, UploadError> {
    let urls = futures::future::try_join_all(files.iter().map(|f| store.upload(f)))
        .await
        .inspect_err(|e| tracing::warn!(error = %e, files = files.len(), "Upload batch failed"))?;
    Ok(urls)
}
