use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use shared::{Detection, DetectionInfo, IdentifierModel};
use std::time::Duration;

use super::{default_bounding_box, Identification, WeedIdentifier, CANONICAL_FRAME};
use crate::error::UpstreamError;
use crate::storage::ImageUpload;
use crate::upstream;

const SERVICE: &str = "weed classifier";

#[derive(Debug, Deserialize)]
pub struct ClassifierResponse {
    #[serde(default)]
    pub weed_type: Option<String>,
    /// Fraction in 0..=1.
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl ClassifierResponse {
    /// Rescales to a percentage and synthesises one detection centred on the
    /// canonical frame.
    pub fn into_identification(self) -> Identification {
        let weed_name = self.weed_type.unwrap_or_else(|| "Unknown".to_string());
        let fraction = self.confidence.unwrap_or(0.0);
        let detection = Detection {
            bbox: Some(default_bounding_box(CANONICAL_FRAME.0, CANONICAL_FRAME.1)),
            class_id: 0,
            class_name: weed_name.clone(),
            confidence: fraction,
        };
        Identification {
            weed_name,
            confidence: fraction * 100.0,
            detection_info: DetectionInfo {
                detection_count: 1,
                detections: vec![detection],
                model_used: IdentifierModel::Legacy,
            },
        }
    }
}

/// Single-label image classifier.
#[derive(Clone)]
pub struct ClassifierClient {
    http_client: HttpClient,
    endpoint: String,
    timeout: Duration,
}

impl ClassifierClient {
    pub fn new(http_client: HttpClient, endpoint: String, timeout: Duration) -> Self {
        Self {
            http_client,
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl WeedIdentifier for ClassifierClient {
    fn model(&self) -> IdentifierModel {
        IdentifierModel::Legacy
    }

    async fn identify(&self, image: &ImageUpload) -> Result<Identification, UpstreamError> {
        let form = upstream::image_form(SERVICE, "file", image)?;
        let response = self
            .http_client
            .post(&self.endpoint)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::http(SERVICE, e))?;
        let response = upstream::ensure_success(SERVICE, response).await?;
        let payload: ClassifierResponse = upstream::read_json(SERVICE, response).await?;
        Ok(payload.into_identification())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_rescaled_to_percentage() {
        let payload: ClassifierResponse =
            serde_json::from_str(r#"{"weed_type":"black_nightshade","confidence":0.82}"#).unwrap();
        let identification = payload.into_identification();

        assert_eq!(identification.weed_name, "black_nightshade");
        assert!((identification.confidence - 82.0).abs() < 1e-9);
        assert_eq!(identification.detection_info.detection_count, 1);
        assert_eq!(identification.detection_info.model_used, IdentifierModel::Legacy);

        let detection = &identification.detection_info.detections[0];
        assert_eq!(detection.class_name, "black_nightshade");
        assert_eq!(detection.confidence, 0.82);
        let bbox = detection.bbox.unwrap();
        assert_eq!((bbox.x1 + bbox.x2) / 2.0, 320.0);
        assert_eq!((bbox.y1 + bbox.y2) / 2.0, 240.0);
        assert_eq!((bbox.width, bbox.height), (256.0, 192.0));
    }

    #[test]
    fn missing_fields_default() {
        let payload: ClassifierResponse = serde_json::from_str("{}").unwrap();
        let identification = payload.into_identification();
        assert_eq!(identification.weed_name, "Unknown");
        assert_eq!(identification.confidence, 0.0);
    }
}
