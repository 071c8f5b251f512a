use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::db::RepositoryError;
use crate::models::BlockError;
use crate::storage::StorageError;

/// Failure talking to one of the upstream model or weather services.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} response could not be parsed: {source}")]
    Json {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{service} returned an invalid payload: {reason}")]
    InvalidPayload {
        service: &'static str,
        reason: String,
    },
    #[error("invalid {service} URL: {source}")]
    Url {
        service: &'static str,
        #[source]
        source: url::ParseError,
    },
}

impl UpstreamError {
    pub fn http(service: &'static str, source: reqwest::Error) -> Self {
        UpstreamError::Http { service, source }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Http { source, .. } if source.is_timeout())
    }
}

/// Hard failures of the analysis pipeline and of the history boundary.
///
/// Soft failures (weather, malformed predictor payloads, knowledge misses)
/// are absorbed where they happen and never surface as this type.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Image storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Weed identification failed: {0}")]
    Identification(#[source] UpstreamError),
    #[error("Rate prediction failed: {0}")]
    Prediction(#[source] UpstreamError),
    #[error("Herbicide lookup failed: {0}")]
    KnowledgeStore(#[source] RepositoryError),
    #[error("Failed to encode analysis result: {0}")]
    Encoding(#[from] BlockError),
    #[error("Failed to persist analysis record: {0}")]
    Persistence(#[source] RepositoryError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Analysis record not found with id: {0}")]
    NotFound(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ResponseError for AnalysisError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AnalysisError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalysisError::Identification(_) | AnalysisError::Prediction(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
