pub mod local_service;
pub mod s3_service;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Image is empty")]
    EmptyImage,
    #[error("Image too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: usize, limit: usize },
    #[error("Unrecognised image location: {0}")]
    InvalidLocation(String),
}

/// An uploaded image as received at the boundary.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl ImageUpload {
    /// Extension (with leading dot) taken from the uploaded file name.
    /// Anything other than ASCII alphanumerics after the last dot falls back
    /// to `.jpg`.
    pub fn extension(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_else(|| ".jpg".to_string())
    }

    pub fn mime_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }

    pub fn validate(&self, max_bytes: usize) -> Result<(), StorageError> {
        if self.bytes.is_empty() {
            return Err(StorageError::EmptyImage);
        }
        if self.bytes.len() > max_bytes {
            return Err(StorageError::FileTooLarge {
                size: self.bytes.len(),
                limit: max_bytes,
            });
        }
        Ok(())
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists the image and returns where it was written.
    async fn save(&self, upload: &ImageUpload) -> Result<String, StorageError>;

    async fn delete(&self, location: &str) -> Result<(), StorageError>;
}
