use actix_multipart::Multipart;
use actix_web::{web, Error, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use shared::IdentifierModel;
use std::collections::HashMap;

use crate::analysis::history_service::HistoryService;
use crate::analysis::pipeline::AnalysisService;
use crate::error::{AnalysisError, ErrorResponse};
use crate::models::{AnalysisContext, Coordinates};
use crate::storage::ImageUpload;
use crate::weather::WeatherEnricher;

const IMAGE_FIELD: &str = "image";
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Largest accepted image upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit {
    pub max_image_bytes: usize,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/herbicide-analysis").route(web::post().to(analyze)))
        .service(web::resource("/herbicide-analysis/history").route(web::get().to(list_history)))
        .service(
            web::resource("/herbicide-analysis/history/{id}")
                .route(web::get().to(get_history))
                .route(web::delete().to(delete_history)),
        )
        .service(web::resource("/herbicide-analysis/statistics").route(web::get().to(statistics)))
        .service(web::resource("/api/weather").route(web::get().to(current_weather)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Fields collected from an analysis upload before validation.
#[derive(Debug, Default)]
struct AnalysisForm {
    image: Option<ImageUpload>,
    fields: HashMap<String, String>,
}

impl AnalysisForm {
    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required_text(&self, name: &str) -> Result<String, AnalysisError> {
        self.text(name)
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::InvalidRequest(format!("Missing field '{}'", name)))
    }

    fn optional_number(&self, name: &str) -> Result<Option<f64>, AnalysisError> {
        self.text(name)
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        AnalysisError::InvalidRequest(format!("Field '{}' is not a number: {}", name, raw))
                    })
            })
            .transpose()
    }

    fn required_number(&self, name: &str) -> Result<f64, AnalysisError> {
        self.optional_number(name)?
            .ok_or_else(|| AnalysisError::InvalidRequest(format!("Missing field '{}'", name)))
    }

    fn use_new_model(&self) -> Result<bool, AnalysisError> {
        match self.text("useNewModel") {
            None => Ok(false),
            Some(raw) => raw.to_ascii_lowercase().parse::<bool>().map_err(|_| {
                AnalysisError::InvalidRequest(format!("Field 'useNewModel' is not a boolean: {}", raw))
            }),
        }
    }

    fn into_request(
        self,
        max_image_bytes: usize,
    ) -> Result<(ImageUpload, AnalysisContext), AnalysisError> {
        let coordinates = Coordinates::from_parts(
            self.optional_number("latitude")?,
            self.optional_number("longitude")?,
        )
        .map_err(|e| AnalysisError::InvalidRequest(e.to_string()))?;

        let context = AnalysisContext {
            soil_type: self.required_text("soilType")?,
            growth_stage: self.required_text("growthStage")?,
            temperature: self.required_number("temperature")?,
            humidity: self.required_number("humidity")?,
            coordinates,
            model: IdentifierModel::from_use_new_model(self.use_new_model()?),
            user_id: self.text("userId").map(str::to_string),
        };

        let image = self
            .image
            .filter(|image| !image.bytes.is_empty())
            .ok_or_else(|| AnalysisError::InvalidRequest("Missing image file".to_string()))?;
        image
            .validate(max_image_bytes)
            .map_err(|e| AnalysisError::InvalidRequest(e.to_string()))?;

        Ok((image, context))
    }
}

/// Buffers the form, stopping as soon as a field grows past its cap.
async fn read_form(mut payload: Multipart, max_image_bytes: usize) -> Result<AnalysisForm, Error> {
    let mut form = AnalysisForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());
        let max_field_bytes = if name == IMAGE_FIELD {
            max_image_bytes
        } else {
            MAX_TEXT_FIELD_BYTES
        };

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > max_field_bytes {
                return Err(AnalysisError::InvalidRequest(format!(
                    "Field '{}' exceeds the {} byte limit",
                    name, max_field_bytes
                ))
                .into());
            }
            data.extend_from_slice(&chunk);
        }

        if name == IMAGE_FIELD {
            form.image = Some(ImageUpload {
                bytes: data,
                file_name,
                content_type,
            });
        } else {
            let value = String::from_utf8(data).map_err(|_| {
                AnalysisError::InvalidRequest(format!("Field '{}' is not valid UTF-8", name))
            })?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

async fn analyze(
    service: web::Data<AnalysisService>,
    limit: web::Data<UploadLimit>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let (image, context) = read_form(payload, limit.max_image_bytes)
        .await?
        .into_request(limit.max_image_bytes)?;
    info!(
        "Received herbicide analysis request: soil={}, stage={}, model={}",
        context.soil_type, context.growth_stage, context.model
    );

    let response = service.analyze(image, context).await?;
    Ok(HttpResponse::Ok().json(response))
}

async fn list_history(history: web::Data<HistoryService>) -> Result<HttpResponse, AnalysisError> {
    let entries = history.list().await?;
    Ok(HttpResponse::Ok().json(entries))
}

async fn get_history(
    history: web::Data<HistoryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AnalysisError> {
    let entry = history.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entry))
}

async fn delete_history(
    history: web::Data<HistoryService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AnalysisError> {
    history.delete(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn statistics(history: web::Data<HistoryService>) -> Result<HttpResponse, AnalysisError> {
    let stats = history.statistics().await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[derive(Debug, Deserialize)]
struct WeatherQuery {
    latitude: f64,
    longitude: f64,
}

async fn current_weather(
    weather: web::Data<WeatherEnricher>,
    query: web::Query<WeatherQuery>,
) -> HttpResponse {
    let coordinates = Coordinates {
        latitude: query.latitude,
        longitude: query.longitude,
    };
    match weather.lookup(coordinates).await {
        Ok(reading) => HttpResponse::Ok().json(reading),
        Err(e) => {
            error!("Weather lookup failed: {}", e);
            HttpResponse::BadGateway().json(ErrorResponse {
                error: format!("Weather lookup failed: {}", e),
            })
        }
    }
}
