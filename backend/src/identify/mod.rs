pub mod classifier_client;
pub mod detector_client;

use async_trait::async_trait;
use shared::{BoundingBox, DetectionInfo, IdentifierModel};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::UpstreamError;
use crate::storage::ImageUpload;

/// Frame the legacy classifier's synthetic detection is placed on.
pub const CANONICAL_FRAME: (f64, f64) = (640.0, 480.0);

/// Uniform output of every weed identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub weed_name: String,
    /// Percentage, 0..=100.
    pub confidence: f64,
    pub detection_info: DetectionInfo,
}

#[async_trait]
pub trait WeedIdentifier: Send + Sync {
    fn model(&self) -> IdentifierModel;

    async fn identify(&self, image: &ImageUpload) -> Result<Identification, UpstreamError>;
}

/// Box covering 40% of each frame dimension, centred on the frame.
pub fn default_bounding_box(frame_width: f64, frame_height: f64) -> BoundingBox {
    let width = frame_width * 0.4;
    let height = frame_height * 0.4;
    let center_x = frame_width / 2.0;
    let center_y = frame_height / 2.0;
    BoundingBox {
        x1: center_x - width / 2.0,
        y1: center_y - height / 2.0,
        x2: center_x + width / 2.0,
        y2: center_y + height / 2.0,
        width,
        height,
    }
}

/// The identifiers available to the pipeline, selected per request.
#[derive(Clone, Default)]
pub struct IdentifierSet {
    identifiers: HashMap<IdentifierModel, Arc<dyn WeedIdentifier>>,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, identifier: Arc<dyn WeedIdentifier>) -> Self {
        self.identifiers.insert(identifier.model(), identifier);
        self
    }

    pub fn get(&self, model: IdentifierModel) -> Option<Arc<dyn WeedIdentifier>> {
        self.identifiers.get(&model).cloned()
    }
}
