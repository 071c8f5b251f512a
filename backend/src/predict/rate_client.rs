use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::time::Duration;

use super::{FeatureSet, RatePrediction, RatePredictor};
use crate::error::UpstreamError;
use crate::upstream;

const SERVICE: &str = "rate predictor";

#[derive(Clone)]
pub struct RatePredictorClient {
    http_client: HttpClient,
    endpoint: String,
    timeout: Duration,
}

impl RatePredictorClient {
    pub fn new(http_client: HttpClient, endpoint: String, timeout: Duration) -> Self {
        Self {
            http_client,
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl RatePredictor for RatePredictorClient {
    async fn predict(&self, features: &FeatureSet) -> Result<RatePrediction, UpstreamError> {
        log::debug!("Requesting rate prediction for {:?}", features);
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(features)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::http(SERVICE, e))?;
        let response = upstream::ensure_success(SERVICE, response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::http(SERVICE, e))?;
        Ok(RatePrediction::from_body(&body))
    }
}
