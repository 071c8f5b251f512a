use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::{AnalysisStatus, HerbicideOption, IdentifierModel, SafetyPrecautions};
use uuid::Uuid;

/// Version tag written into every serialized block.
pub const BLOCK_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unsupported block version: {0}")]
    UnsupportedVersion(u32),
}

#[derive(Serialize, Deserialize)]
struct VersionedBlock<T> {
    version: u32,
    data: T,
}

pub fn encode_block<T: Serialize>(data: &T) -> Result<String, BlockError> {
    let block = VersionedBlock {
        version: BLOCK_VERSION,
        data,
    };
    Ok(serde_json::to_string(&block)?)
}

pub fn decode_block<T: DeserializeOwned>(text: &str) -> Result<T, BlockError> {
    let block: VersionedBlock<serde_json::Value> = serde_json::from_str(text)?;
    if block.version != BLOCK_VERSION {
        return Err(BlockError::UnsupportedVersion(block.version));
    }
    Ok(serde_json::from_value(block.data)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatesError {
    #[error("latitude and longitude must be provided together")]
    Unpaired,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Both halves must be present; a lone latitude or longitude is rejected.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, CoordinatesError> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Ok(Some(Self { latitude, longitude })),
            (None, None) => Ok(None),
            _ => Err(CoordinatesError::Unpaired),
        }
    }

    /// Rounds both coordinates to 4 decimal places.
    pub fn rounded(&self) -> Self {
        let round4 = |v: f64| (v * 10_000.0).round() / 10_000.0;
        Self {
            latitude: round4(self.latitude),
            longitude: round4(self.longitude),
        }
    }
}

/// Agronomic context supplied with the image.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisContext {
    pub soil_type: String,
    pub growth_stage: String,
    pub temperature: f64,
    pub humidity: f64,
    pub coordinates: Option<Coordinates>,
    pub model: IdentifierModel,
    pub user_id: Option<String>,
}

/// History of one analysis attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub weed_name: Option<String>,
    pub confidence: Option<f64>,
    pub soil_type: String,
    pub growth_stage: String,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub wind_speed: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub predicted_herbicide_name: Option<String>,
    pub predicted_application_rate: Option<f64>,
    pub model_used: IdentifierModel,
    pub detection_count: Option<u32>,
    pub image_path: Option<String>,
    pub weather_constraints: Option<String>,
    pub safety_precautions: Option<String>,
    pub herbicide_options: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<String>,
    pub analysis_status: AnalysisStatus,
    pub error_message: Option<String>,
}

impl AnalysisRecord {
    pub fn pending(context: &AnalysisContext) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            weed_name: None,
            confidence: None,
            soil_type: context.soil_type.clone(),
            growth_stage: context.growth_stage.clone(),
            temperature: context.temperature,
            humidity: context.humidity,
            rainfall: 0.0,
            wind_speed: None,
            latitude: context.coordinates.map(|c| c.latitude),
            longitude: context.coordinates.map(|c| c.longitude),
            predicted_herbicide_name: None,
            predicted_application_rate: None,
            model_used: context.model,
            detection_count: None,
            image_path: None,
            weather_constraints: None,
            safety_precautions: None,
            herbicide_options: None,
            created_at: Utc::now(),
            user_id: context.user_id.clone(),
            analysis_status: AnalysisStatus::Pending,
            error_message: None,
        }
    }

    pub fn mark_success(&mut self) {
        self.analysis_status = AnalysisStatus::Success;
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, error: String) {
        self.analysis_status = AnalysisStatus::Failed;
        self.error_message = Some(error);
    }
}

/// A record as returned by the history endpoints, with its serialized
/// blocks decoded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisHistoryEntry {
    #[serde(flatten)]
    pub record: AnalysisRecord,
    pub parsed_safety_precautions: Option<SafetyPrecautions>,
    pub parsed_herbicide_options: Vec<HerbicideOption>,
}

impl From<AnalysisRecord> for AnalysisHistoryEntry {
    fn from(record: AnalysisRecord) -> Self {
        let parsed_safety_precautions = record.safety_precautions.as_deref().and_then(|text| {
            decode_block(text)
                .map_err(|e| log::warn!("Record {} has unreadable safety block: {}", record.id, e))
                .ok()
        });
        let parsed_herbicide_options = record
            .herbicide_options
            .as_deref()
            .and_then(|text| {
                decode_block(text)
                    .map_err(|e| log::warn!("Record {} has unreadable options block: {}", record.id, e))
                    .ok()
            })
            .unwrap_or_default();
        Self {
            record,
            parsed_safety_precautions,
            parsed_herbicide_options,
        }
    }
}

/// Herbicide knowledge-base entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerbicideEntry {
    pub name: String,
    #[serde(default)]
    pub safe_for_tomato: Option<bool>,
    #[serde(default)]
    pub mode_of_action: Option<String>,
    #[serde(default)]
    pub application_method: Option<String>,
    #[serde(default)]
    pub resistance_reported: Option<bool>,
    #[serde(default)]
    pub alternative_herbicide: Option<String>,
    #[serde(default)]
    pub toxicity: Option<String>,
    #[serde(default)]
    pub human_protection: Option<String>,
    #[serde(default)]
    pub environmental_precautions: Option<String>,
}
