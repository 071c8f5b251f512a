pub mod openweather_client;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::error::UpstreamError;
use crate::models::Coordinates;

/// Serialized with snake_case keys, as the weather endpoint returns it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherReading {
    pub wind_speed: Option<f64>,
    pub rainfall: f64,
}

impl Default for WeatherReading {
    fn default() -> Self {
        Self {
            wind_speed: None,
            rainfall: 0.0,
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions at already-rounded coordinates.
    async fn current(&self, coordinates: Coordinates) -> Result<WeatherReading, UpstreamError>;
}

/// Application constraints derived from wind and rain, wind clause first.
pub fn weather_constraints(wind_speed: Option<f64>, rainfall: f64) -> String {
    let mut clauses: Vec<&str> = Vec::with_capacity(2);

    if let Some(wind) = wind_speed {
        clauses.push(if wind > 10.0 {
            "High wind, not recommended"
        } else if wind > 5.0 {
            "Moderate wind, use caution"
        } else {
            "Low wind, favorable"
        });
    }

    if rainfall > 0.0 {
        clauses.push(if rainfall > 15.0 {
            "Heavy rain, avoid application"
        } else if rainfall > 5.0 {
            "Light rain, limited efficacy"
        } else {
            "No significant rain"
        });
    }

    if clauses.is_empty() {
        "No specific constraints".to_string()
    } else {
        clauses.join(", ")
    }
}

/// Wraps a provider so that every failure degrades to the default reading.
#[derive(Clone)]
pub struct WeatherEnricher {
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherEnricher {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Fetches conditions, propagating failures. Used by the weather endpoint.
    pub async fn lookup(&self, coordinates: Coordinates) -> Result<WeatherReading, UpstreamError> {
        self.provider.current(coordinates.rounded()).await
    }

    /// No coordinates means no call at all.
    pub async fn enrich(&self, coordinates: Option<Coordinates>) -> WeatherReading {
        let Some(coordinates) = coordinates else {
            return WeatherReading::default();
        };
        match self.lookup(coordinates).await {
            Ok(reading) => reading,
            Err(e) => {
                if e.is_timeout() {
                    log::warn!("Weather lookup timed out, continuing without weather data");
                } else {
                    log::warn!("Weather lookup failed, continuing without weather data: {}", e);
                }
                WeatherReading::default()
            }
        }
    }
}
