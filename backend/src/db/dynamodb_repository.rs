use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use shared::{AnalysisStatus, IdentifierModel};
use std::collections::HashMap;
use std::str::FromStr;

use super::{AnalysisRecordStore, HerbicideStore, RepositoryError};
use crate::models::{AnalysisRecord, HerbicideEntry};

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoDbRepository {
    client: Client,
    records_table: String,
    herbicides_table: String,
}

impl DynamoDbRepository {
    pub fn new(client: Client, records_table: String, herbicides_table: String) -> Self {
        Self {
            client,
            records_table,
            herbicides_table,
        }
    }

    /// Fails early when either table is missing or inaccessible.
    pub async fn verify_tables(&self) -> Result<(), RepositoryError> {
        for table in [&self.records_table, &self.herbicides_table] {
            match self.client.describe_table().table_name(table).send().await {
                Ok(response) => {
                    log::info!(
                        "DynamoDB table '{}' exists with status: {:?}",
                        table,
                        response.table().and_then(|t| t.table_status())
                    );
                }
                Err(e) => {
                    log::error!("DynamoDB table '{}' is not accessible: {:?}", table, e);
                    return Err(RepositoryError::DynamoDb(format!(
                        "Table '{}' not accessible: {}",
                        table, e
                    )));
                }
            }
        }
        Ok(())
    }

    fn key(name: &str, value: &str) -> Item {
        let mut key = HashMap::new();
        key.insert(name.to_string(), AttributeValue::S(value.to_string()));
        key
    }
}

#[async_trait]
impl HerbicideStore for DynamoDbRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<HerbicideEntry>, RepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.herbicides_table)
            .set_key(Some(Self::key("name", name)))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        result.item.map(parse_herbicide_from_item).transpose()
    }
}

#[async_trait]
impl AnalysisRecordStore for DynamoDbRepository {
    async fn save(&self, record: &AnalysisRecord) -> Result<String, RepositoryError> {
        log::debug!(
            "Writing analysis record {} ({}) to table '{}'",
            record.id,
            record.analysis_status,
            self.records_table
        );
        self.client
            .put_item()
            .table_name(&self.records_table)
            .set_item(Some(record_to_item(record)))
            .send()
            .await
            .map_err(|e| {
                log::error!("DynamoDB put_item failed for record {}: {:?}", record.id, e);
                let error_msg = if let Some(service_err) = e.as_service_error() {
                    format!("Service error: {:?}", service_err)
                } else {
                    format!("SDK error: {}", e)
                };
                RepositoryError::DynamoDb(error_msg)
            })?;
        Ok(record.id.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<AnalysisRecord>, RepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.records_table)
            .set_key(Some(Self::key("id", id)))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

        result.item.map(parse_record_from_item).transpose()
    }

    async fn list_recent(&self) -> Result<Vec<AnalysisRecord>, RepositoryError> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let result = self
                .client
                .scan()
                .table_name(&self.records_table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;

            if let Some(items) = result.items {
                for item in items {
                    records.push(parse_record_from_item(item)?);
                }
            }
            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.client
            .delete_item()
            .table_name(&self.records_table)
            .set_key(Some(Self::key("id", id)))
            .send()
            .await
            .map_err(|e| RepositoryError::DynamoDb(e.to_string()))?;
        Ok(())
    }
}

fn put_s(item: &mut Item, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        item.insert(name.to_string(), AttributeValue::S(value.to_string()));
    }
}

fn put_n(item: &mut Item, name: &str, value: Option<f64>) {
    if let Some(value) = value {
        item.insert(name.to_string(), AttributeValue::N(value.to_string()));
    }
}

pub(crate) fn record_to_item(record: &AnalysisRecord) -> Item {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(record.id.clone()));
    put_s(&mut item, "weed_name", record.weed_name.as_deref());
    put_n(&mut item, "confidence", record.confidence);
    put_s(&mut item, "soil_type", Some(&record.soil_type));
    put_s(&mut item, "growth_stage", Some(&record.growth_stage));
    put_n(&mut item, "temperature", Some(record.temperature));
    put_n(&mut item, "humidity", Some(record.humidity));
    put_n(&mut item, "rainfall", Some(record.rainfall));
    put_n(&mut item, "wind_speed", record.wind_speed);
    put_n(&mut item, "latitude", record.latitude);
    put_n(&mut item, "longitude", record.longitude);
    put_s(
        &mut item,
        "predicted_herbicide_name",
        record.predicted_herbicide_name.as_deref(),
    );
    put_n(
        &mut item,
        "predicted_application_rate",
        record.predicted_application_rate,
    );
    put_s(&mut item, "model_used", Some(&record.model_used.to_string()));
    put_n(&mut item, "detection_count", record.detection_count.map(f64::from));
    put_s(&mut item, "image_path", record.image_path.as_deref());
    put_s(&mut item, "weather_constraints", record.weather_constraints.as_deref());
    put_s(&mut item, "safety_precautions", record.safety_precautions.as_deref());
    put_s(&mut item, "herbicide_options", record.herbicide_options.as_deref());
    put_s(&mut item, "created_at", Some(&record.created_at.to_rfc3339()));
    put_s(&mut item, "user_id", record.user_id.as_deref());
    put_s(
        &mut item,
        "analysis_status",
        Some(&record.analysis_status.to_string()),
    );
    put_s(&mut item, "error_message", record.error_message.as_deref());
    item
}

fn get_s(item: &Item, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

fn get_n(item: &Item, name: &str) -> Result<Option<f64>, RepositoryError> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .map(|n| {
            n.parse::<f64>()
                .map_err(|_| RepositoryError::InvalidData(format!("Invalid {}: {}", name, n)))
        })
        .transpose()
}

fn get_bool(item: &Item, name: &str) -> Option<bool> {
    item.get(name).and_then(|v| v.as_bool().ok()).copied()
}

fn required_s(item: &Item, name: &str) -> Result<String, RepositoryError> {
    get_s(item, name).ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", name)))
}

fn required_n(item: &Item, name: &str) -> Result<f64, RepositoryError> {
    get_n(item, name)?.ok_or_else(|| RepositoryError::InvalidData(format!("Invalid {}", name)))
}

pub(crate) fn parse_record_from_item(item: Item) -> Result<AnalysisRecord, RepositoryError> {
    let model_used = required_s(&item, "model_used")?;
    let model_used = IdentifierModel::from_str(&model_used)
        .map_err(|_| RepositoryError::InvalidData(format!("Invalid model_used: {}", model_used)))?;

    let status = required_s(&item, "analysis_status")?;
    let analysis_status = AnalysisStatus::from_str(&status)
        .map_err(|_| RepositoryError::InvalidData(format!("Invalid analysis_status: {}", status)))?;

    let created_at = get_s(&item, "created_at")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| RepositoryError::InvalidData("Invalid created_at".to_string()))?;

    Ok(AnalysisRecord {
        id: required_s(&item, "id")?,
        weed_name: get_s(&item, "weed_name"),
        confidence: get_n(&item, "confidence")?,
        soil_type: required_s(&item, "soil_type")?,
        growth_stage: required_s(&item, "growth_stage")?,
        temperature: required_n(&item, "temperature")?,
        humidity: required_n(&item, "humidity")?,
        rainfall: get_n(&item, "rainfall")?.unwrap_or(0.0),
        wind_speed: get_n(&item, "wind_speed")?,
        latitude: get_n(&item, "latitude")?,
        longitude: get_n(&item, "longitude")?,
        predicted_herbicide_name: get_s(&item, "predicted_herbicide_name"),
        predicted_application_rate: get_n(&item, "predicted_application_rate")?,
        model_used,
        detection_count: get_n(&item, "detection_count")?.map(|n| n as u32),
        image_path: get_s(&item, "image_path"),
        weather_constraints: get_s(&item, "weather_constraints"),
        safety_precautions: get_s(&item, "safety_precautions"),
        herbicide_options: get_s(&item, "herbicide_options"),
        created_at,
        user_id: get_s(&item, "user_id"),
        analysis_status,
        error_message: get_s(&item, "error_message"),
    })
}

pub(crate) fn parse_herbicide_from_item(item: Item) -> Result<HerbicideEntry, RepositoryError> {
    Ok(HerbicideEntry {
        name: required_s(&item, "name")?,
        safe_for_tomato: get_bool(&item, "safe_for_tomato"),
        mode_of_action: get_s(&item, "mode_of_action"),
        application_method: get_s(&item, "application_method"),
        resistance_reported: get_bool(&item, "resistance_reported"),
        alternative_herbicide: get_s(&item, "alternative_herbicide"),
        toxicity: get_s(&item, "toxicity"),
        human_protection: get_s(&item, "human_protection"),
        environmental_precautions: get_s(&item, "environmental_precautions"),
    })
}
