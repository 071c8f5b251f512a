use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use shared::{BoundingBox, Detection, DetectionInfo, IdentifierModel};
use std::time::Duration;

use super::{Identification, WeedIdentifier};
use crate::error::UpstreamError;
use crate::storage::ImageUpload;
use crate::upstream;

const SERVICE: &str = "weed detector";

#[derive(Debug, Deserialize)]
pub struct RawDetection {
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    pub class_id: i64,
    pub class_name: String,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
pub struct DetectorResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub detection_count: Option<u32>,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DetectorResponse {
    /// The first detection is primary. No detections, or a reply whose status
    /// is not "success", means "Unknown" at 0%.
    pub fn into_identification(self) -> Identification {
        if self.status.as_deref() != Some("success") {
            log::warn!(
                "Detector replied with status '{}': {}",
                self.status.as_deref().unwrap_or("missing"),
                self.message
                    .as_deref()
                    .or(self.error.as_deref())
                    .unwrap_or("no detail given")
            );
            return Identification {
                weed_name: "Unknown".to_string(),
                confidence: 0.0,
                detection_info: DetectionInfo {
                    detection_count: 0,
                    detections: Vec::new(),
                    model_used: IdentifierModel::Detector,
                },
            };
        }

        let detections: Vec<Detection> = self
            .detections
            .into_iter()
            .map(|raw| Detection {
                bbox: raw.bbox,
                class_id: raw.class_id,
                class_name: raw.class_name,
                confidence: raw.confidence,
            })
            .collect();

        let (weed_name, confidence) = match detections.first() {
            Some(primary) => (primary.class_name.clone(), primary.confidence * 100.0),
            None => ("Unknown".to_string(), 0.0),
        };
        let detection_count = self
            .detection_count
            .unwrap_or(detections.len() as u32);

        Identification {
            weed_name,
            confidence,
            detection_info: DetectionInfo {
                detection_count,
                detections,
                model_used: IdentifierModel::Detector,
            },
        }
    }
}

/// Multi-object weed detector.
#[derive(Clone)]
pub struct DetectorClient {
    http_client: HttpClient,
    endpoint: String,
    timeout: Duration,
}

impl DetectorClient {
    pub fn new(http_client: HttpClient, endpoint: String, timeout: Duration) -> Self {
        Self {
            http_client,
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl WeedIdentifier for DetectorClient {
    fn model(&self) -> IdentifierModel {
        IdentifierModel::Detector
    }

    async fn identify(&self, image: &ImageUpload) -> Result<Identification, UpstreamError> {
        let form = upstream::image_form(SERVICE, "image", image)?;
        let response = self
            .http_client
            .post(&self.endpoint)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::http(SERVICE, e))?;
        let response = upstream::ensure_success(SERVICE, response).await?;
        let payload: DetectorResponse = upstream::read_json(SERVICE, response).await?;
        let identification = payload.into_identification();
        log::debug!(
            "Detector found {} weeds, primary '{}'",
            identification.detection_info.detection_count,
            identification.weed_name
        );
        Ok(identification)
    }
}
