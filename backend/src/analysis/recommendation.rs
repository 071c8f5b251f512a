use shared::{HerbicideOption, SafetyPrecautions};
use std::sync::Arc;

use crate::db::{HerbicideStore, RepositoryError};
use crate::models::HerbicideEntry;

/// Alternative products are dosed at 90% of the predicted rate.
pub const ALTERNATIVE_RATE_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recommendation {
    pub options: Vec<HerbicideOption>,
    pub safety_precautions: Option<SafetyPrecautions>,
}

/// `"<rate> L/ha"`, with whole numbers keeping their trailing `.0`.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:?} L/ha", rate),
        None => "Unknown".to_string(),
    }
}

fn tri_state(value: Option<bool>) -> String {
    value.map_or_else(|| "Unknown".to_string(), |v| v.to_string())
}

fn option_from_entry(entry: &HerbicideEntry, rate: Option<f64>, weather_constraints: &str) -> HerbicideOption {
    HerbicideOption {
        name: entry.name.clone(),
        application_rate: format_rate(rate),
        safe_for_tomato: tri_state(entry.safe_for_tomato),
        mode_of_action: entry.mode_of_action.clone(),
        application_method: entry.application_method.clone(),
        weather_constraints: weather_constraints.to_string(),
        resistance_reported: tri_state(entry.resistance_reported),
        alternative_herbicide: entry.alternative_herbicide.clone(),
    }
}

#[derive(Clone)]
pub struct RecommendationBuilder {
    herbicides: Arc<dyn HerbicideStore>,
}

impl RecommendationBuilder {
    pub fn new(herbicides: Arc<dyn HerbicideStore>) -> Self {
        Self { herbicides }
    }

    /// Builds up to two options: the predicted herbicide, then its named
    /// alternative. Only one hop is followed, whatever the alternative
    /// itself points to.
    pub async fn build(
        &self,
        predicted_name: Option<&str>,
        predicted_rate: Option<f64>,
        weather_constraints: &str,
    ) -> Result<Recommendation, RepositoryError> {
        let Some(name) = predicted_name else {
            return Ok(Recommendation::default());
        };

        let Some(primary) = self.herbicides.find_by_name(name).await? else {
            log::warn!("Predicted herbicide '{}' is not in the knowledge store", name);
            return Ok(Recommendation::default());
        };

        let mut options = vec![option_from_entry(&primary, predicted_rate, weather_constraints)];
        let safety_precautions = Some(SafetyPrecautions {
            toxicity: primary.toxicity.clone(),
            human_protection: primary.human_protection.clone(),
            environmental_precautions: primary.environmental_precautions.clone(),
        });

        if let Some(alternative_name) = primary
            .alternative_herbicide
            .as_deref()
            .filter(|n| !n.is_empty())
        {
            match self.herbicides.find_by_name(alternative_name).await? {
                Some(alternative) => {
                    let rate = predicted_rate.map(|r| r * ALTERNATIVE_RATE_FACTOR);
                    options.push(option_from_entry(&alternative, rate, weather_constraints));
                }
                None => log::warn!(
                    "Alternative herbicide '{}' of '{}' is not in the knowledge store",
                    alternative_name,
                    primary.name
                ),
            }
        }

        Ok(Recommendation {
            options,
            safety_precautions,
        })
    }
}
