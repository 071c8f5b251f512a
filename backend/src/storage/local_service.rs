use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use super::{ImageStore, ImageUpload, StorageError};

/// Writes uploads under a local directory as `<uuid><ext>`.
#[derive(Clone)]
pub struct LocalImageStore {
    upload_dir: PathBuf,
    max_image_bytes: usize,
}

impl LocalImageStore {
    pub fn new(upload_dir: impl Into<PathBuf>, max_image_bytes: usize) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_image_bytes,
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, upload: &ImageUpload) -> Result<String, StorageError> {
        upload.validate(self.max_image_bytes)?;
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let file_name = format!("{}{}", Uuid::new_v4(), upload.extension());
        let path = self.upload_dir.join(file_name);
        tokio::fs::write(&path, &upload.bytes).await?;

        log::debug!("Stored {} byte image at {}", upload.bytes.len(), path.display());
        Ok(path.to_string_lossy().into_owned())
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(location).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
