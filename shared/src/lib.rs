use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Which weed identifier ran for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IdentifierModel {
    Legacy,
    Detector,
}

impl IdentifierModel {
    /// Maps the boundary's `useNewModel` flag onto a variant.
    pub fn from_use_new_model(use_new_model: bool) -> Self {
        if use_new_model {
            IdentifierModel::Detector
        } else {
            IdentifierModel::Legacy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub bbox: Option<BoundingBox>,
    pub class_id: i64,
    pub class_name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionInfo {
    pub detection_count: u32,
    pub detections: Vec<Detection>,
    pub model_used: IdentifierModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerbicideOption {
    pub name: String,
    pub application_rate: String,
    pub safe_for_tomato: String,
    pub mode_of_action: Option<String>,
    pub application_method: Option<String>,
    pub weather_constraints: String,
    pub resistance_reported: String,
    pub alternative_herbicide: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyPrecautions {
    pub toxicity: Option<String>,
    pub human_protection: Option<String>,
    pub environmental_precautions: Option<String>,
}

/// Body returned by a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerbicideAnalysisResponse {
    pub id: String,
    pub weed_name: String,
    pub confidence: f64,
    pub soil_type: String,
    pub growth_stage: String,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub wind_speed: Option<f64>,
    pub weather_constraints: String,
    pub predicted_application_rate: Option<f64>,
    pub predicted_herbicide_name: Option<String>,
    pub herbicide_options: Vec<HerbicideOption>,
    pub safety_precautions: Option<SafetyPrecautions>,
    pub detection_info: DetectionInfo,
}
