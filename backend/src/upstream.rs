use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::UpstreamError;
use crate::storage::ImageUpload;

/// Turns a non-2xx response into `UpstreamError::Status`.
pub async fn ensure_success(
    service: &'static str,
    response: Response,
) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    log::warn!("{} returned {}: {}", service, status, body);
    Err(UpstreamError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

/// Reads the body as text and decodes it, keeping the service name on errors.
pub async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, UpstreamError> {
    let text = response
        .text()
        .await
        .map_err(|e| UpstreamError::http(service, e))?;
    log::debug!("{} response: {}", service, text);
    serde_json::from_str(&text).map_err(|source| UpstreamError::Json { service, source })
}

/// Single-part multipart form carrying the image under `field`.
pub fn image_form(
    service: &'static str,
    field: &'static str,
    image: &ImageUpload,
) -> Result<Form, UpstreamError> {
    let file_name = image
        .file_name
        .clone()
        .unwrap_or_else(|| format!("upload{}", image.extension()));
    let part = Part::bytes(image.bytes.clone())
        .file_name(file_name)
        .mime_str(&image.mime_type())
        .map_err(|e| UpstreamError::http(service, e))?;
    Ok(Form::new().part(field, part))
}
