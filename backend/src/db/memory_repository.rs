use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AnalysisRecordStore, HerbicideStore, RepositoryError};
use crate::models::{AnalysisRecord, HerbicideEntry};

/// Process-local stores for development and tests.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    herbicides: Arc<RwLock<HashMap<String, HerbicideEntry>>>,
    records: Arc<RwLock<HashMap<String, AnalysisRecord>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_herbicides(entries: Vec<HerbicideEntry>) -> Self {
        let herbicides = entries
            .into_iter()
            .map(|entry| (entry.name.clone(), entry))
            .collect();
        Self {
            herbicides: Arc::new(RwLock::new(herbicides)),
            records: Arc::default(),
        }
    }

    /// Loads a JSON array of herbicide entries.
    pub async fn from_seed_file(path: &Path) -> Result<Self, RepositoryError> {
        let text = tokio::fs::read_to_string(path).await?;
        let entries: Vec<HerbicideEntry> = serde_json::from_str(&text)?;
        log::info!(
            "Seeded in-memory knowledge store with {} herbicides from {}",
            entries.len(),
            path.display()
        );
        Ok(Self::with_herbicides(entries))
    }

    pub async fn upsert_herbicide(&self, entry: HerbicideEntry) {
        self.herbicides.write().await.insert(entry.name.clone(), entry);
    }
}

#[async_trait]
impl HerbicideStore for MemoryRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<HerbicideEntry>, RepositoryError> {
        Ok(self.herbicides.read().await.get(name).cloned())
    }
}

#[async_trait]
impl AnalysisRecordStore for MemoryRepository {
    async fn save(&self, record: &AnalysisRecord) -> Result<String, RepositoryError> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record.id.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<AnalysisRecord>, RepositoryError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_recent(&self) -> Result<Vec<AnalysisRecord>, RepositoryError> {
        let mut records: Vec<AnalysisRecord> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        match self.records.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound),
        }
    }
}
