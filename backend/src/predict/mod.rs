pub mod rate_client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

/// Merged features sent to the rate model, keyed by its training columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSet {
    #[serde(rename = "Weed Name")]
    pub weed_name: String,
    #[serde(rename = "Soil Type")]
    pub soil_type: String,
    #[serde(rename = "Growth Stage")]
    pub growth_stage: String,
    #[serde(rename = "Temp (°C)")]
    pub temperature: f64,
    #[serde(rename = "Humidity (%)")]
    pub humidity: f64,
    #[serde(rename = "Wind Speed (km/h)")]
    pub wind_speed: Option<f64>,
    #[serde(rename = "Rainfall (mm)")]
    pub rainfall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RatePrediction {
    #[serde(default, alias = "Predicted Herbicide Name")]
    pub predicted_herbicide_name: Option<String>,
    #[serde(default, alias = "Predicted Application Rate (L/ha)")]
    pub predicted_application_rate: Option<f64>,
}

impl RatePrediction {
    /// Decodes a successful predictor body. Anything malformed yields an
    /// empty prediction instead of an error.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<RatePrediction>(body) {
            Ok(prediction) => {
                if prediction.predicted_herbicide_name.is_none()
                    || prediction.predicted_application_rate.is_none()
                {
                    log::warn!("Rate predictor response is missing fields: {}", body);
                }
                prediction
            }
            Err(e) => {
                log::warn!("Rate predictor response is malformed ({}): {}", e, body);
                RatePrediction::default()
            }
        }
    }
}

#[async_trait]
pub trait RatePredictor: Send + Sync {
    /// Transport errors and non-2xx statuses are errors; a malformed 2xx body
    /// is an empty prediction.
    async fn predict(&self, features: &FeatureSet) -> Result<RatePrediction, UpstreamError>;
}
