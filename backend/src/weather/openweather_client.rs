use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{WeatherProvider, WeatherReading};
use crate::error::UpstreamError;
use crate::models::Coordinates;
use crate::upstream;

const SERVICE: &str = "weather provider";

#[derive(Debug, Default, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub wind: Option<Wind>,
    #[serde(default)]
    pub rain: Option<Rain>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Rain {
    #[serde(rename = "1h", default)]
    pub one_hour: Option<f64>,
}

impl From<CurrentConditions> for WeatherReading {
    fn from(conditions: CurrentConditions) -> Self {
        WeatherReading {
            wind_speed: conditions.wind.and_then(|w| w.speed),
            rainfall: conditions.rain.and_then(|r| r.one_hour).unwrap_or(0.0),
        }
    }
}

/// OpenWeatherMap current-weather endpoint.
#[derive(Clone)]
pub struct OpenWeatherClient {
    http_client: HttpClient,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl OpenWeatherClient {
    pub fn new(http_client: HttpClient, endpoint: String, api_key: String, timeout: Duration) -> Self {
        Self {
            http_client,
            endpoint,
            api_key,
            timeout,
        }
    }

    pub fn request_url(&self, coordinates: Coordinates) -> Result<Url, UpstreamError> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("lat", format!("{:.4}", coordinates.latitude)),
                ("lon", format!("{:.4}", coordinates.longitude)),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ],
        )
        .map_err(|source| UpstreamError::Url {
            service: SERVICE,
            source,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, coordinates: Coordinates) -> Result<WeatherReading, UpstreamError> {
        let url = self.request_url(coordinates)?;
        let response = self
            .http_client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::http(SERVICE, e))?;
        let response = upstream::ensure_success(SERVICE, response).await?;
        let conditions: CurrentConditions = upstream::read_json(SERVICE, response).await?;
        Ok(conditions.into())
    }
}
