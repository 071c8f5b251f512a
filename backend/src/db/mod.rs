pub mod dynamodb_repository;
pub mod memory_repository;

use async_trait::async_trait;

use crate::models::{AnalysisRecord, HerbicideEntry};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Item not found")]
    NotFound,
    #[error("Invalid data format: {0}")]
    InvalidData(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read side of the herbicide knowledge base.
#[async_trait]
pub trait HerbicideStore: Send + Sync {
    /// Exact-name lookup. A miss is `Ok(None)`, not an error.
    async fn find_by_name(&self, name: &str) -> Result<Option<HerbicideEntry>, RepositoryError>;
}

/// Durable history of analysis attempts.
#[async_trait]
pub trait AnalysisRecordStore: Send + Sync {
    /// Inserts or replaces the record under its id.
    async fn save(&self, record: &AnalysisRecord) -> Result<String, RepositoryError>;

    async fn get(&self, id: &str) -> Result<Option<AnalysisRecord>, RepositoryError>;

    /// All records, newest first.
    async fn list_recent(&self) -> Result<Vec<AnalysisRecord>, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}
