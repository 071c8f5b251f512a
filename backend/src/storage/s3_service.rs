use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{Datelike, Utc};
use uuid::Uuid;

use super::{ImageStore, ImageUpload, StorageError};

#[derive(Clone)]
pub struct S3ImageStore {
    client: Client,
    bucket_name: String,
    max_image_bytes: usize,
}

impl S3ImageStore {
    pub fn new(client: Client, bucket_name: String, max_image_bytes: usize) -> Self {
        Self {
            client,
            bucket_name,
            max_image_bytes,
        }
    }

    pub fn generate_s3_key(extension: &str) -> String {
        let now = Utc::now();
        format!(
            "images/{:04}/{:02}/{}{}",
            now.year(),
            now.month(),
            Uuid::new_v4(),
            extension
        )
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket_name, key)
    }

    /// Splits `s3://bucket/key` into its key, checking the bucket matches.
    fn key_from_location<'a>(&self, location: &'a str) -> Result<&'a str, StorageError> {
        location
            .strip_prefix("s3://")
            .and_then(|rest| rest.split_once('/'))
            .filter(|(bucket, key)| *bucket == self.bucket_name && !key.is_empty())
            .map(|(_, key)| key)
            .ok_or_else(|| StorageError::InvalidLocation(location.to_string()))
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn save(&self, upload: &ImageUpload) -> Result<String, StorageError> {
        upload.validate(self.max_image_bytes)?;

        let s3_key = Self::generate_s3_key(&upload.extension());
        let body = ByteStream::from(upload.bytes.clone());

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&s3_key)
            .body(body)
            .content_type(upload.mime_type())
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        Ok(self.location(&s3_key))
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        let s3_key = self.key_from_location(location)?;
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        Ok(())
    }
}
