use serde::Serialize;
use shared::AnalysisStatus;
use std::sync::Arc;

use crate::db::{AnalysisRecordStore, RepositoryError};
use crate::error::AnalysisError;
use crate::models::AnalysisHistoryEntry;
use crate::storage::ImageStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatistics {
    pub total_analyses: usize,
    pub successful_analyses: usize,
    pub failed_analyses: usize,
}

/// Read and delete access to past analyses.
#[derive(Clone)]
pub struct HistoryService {
    records: Arc<dyn AnalysisRecordStore>,
    images: Arc<dyn ImageStore>,
}

impl HistoryService {
    pub fn new(records: Arc<dyn AnalysisRecordStore>, images: Arc<dyn ImageStore>) -> Self {
        Self { records, images }
    }

    pub async fn get(&self, id: &str) -> Result<AnalysisHistoryEntry, AnalysisError> {
        self.records
            .get(id)
            .await
            .map_err(AnalysisError::Persistence)?
            .map(AnalysisHistoryEntry::from)
            .ok_or_else(|| AnalysisError::NotFound(id.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<AnalysisHistoryEntry>, AnalysisError> {
        let records = self
            .records
            .list_recent()
            .await
            .map_err(AnalysisError::Persistence)?;
        Ok(records.into_iter().map(AnalysisHistoryEntry::from).collect())
    }

    /// Removes the record, then its image. Image removal is best effort.
    pub async fn delete(&self, id: &str) -> Result<(), AnalysisError> {
        let record = self
            .records
            .get(id)
            .await
            .map_err(AnalysisError::Persistence)?
            .ok_or_else(|| AnalysisError::NotFound(id.to_string()))?;

        match self.records.delete(id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(AnalysisError::NotFound(id.to_string())),
            Err(e) => return Err(AnalysisError::Persistence(e)),
        }

        if let Some(image_path) = record.image_path.as_deref() {
            if let Err(e) = self.images.delete(image_path).await {
                log::warn!(
                    "Deleted analysis {} but could not remove image {}: {}",
                    id,
                    image_path,
                    e
                );
            }
        }

        log::info!("Deleted herbicide analysis {}", id);
        Ok(())
    }

    pub async fn statistics(&self) -> Result<AnalysisStatistics, AnalysisError> {
        let records = self
            .records
            .list_recent()
            .await
            .map_err(AnalysisError::Persistence)?;
        let mut stats = AnalysisStatistics {
            total_analyses: records.len(),
            ..AnalysisStatistics::default()
        };
        for record in &records {
            match record.analysis_status {
                AnalysisStatus::Success => stats.successful_analyses += 1,
                AnalysisStatus::Failed => stats.failed_analyses += 1,
                AnalysisStatus::Pending => {}
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_repository::MemoryRepository;
    use crate::models::{encode_block, AnalysisContext, AnalysisRecord};
    use crate::storage::{ImageUpload, StorageError};
    use async_trait::async_trait;
    use shared::{HerbicideOption, IdentifierModel};
    use std::sync::Mutex;

    struct FakeImages {
        deleted: Mutex<Vec<String>>,
        fail_delete: bool,
    }

    #[async_trait]
    impl ImageStore for FakeImages {
        async fn save(&self, _upload: &ImageUpload) -> Result<String, StorageError> {
            Ok("unused".into())
        }

        async fn delete(&self, location: &str) -> Result<(), StorageError> {
            self.deleted.lock().unwrap().push(location.to_string());
            if self.fail_delete {
                return Err(StorageError::S3("access denied".into()));
            }
            Ok(())
        }
    }

    fn record(status: AnalysisStatus, image_path: Option<&str>) -> AnalysisRecord {
        let mut record = AnalysisRecord::pending(&AnalysisContext {
            soil_type: "Clay".into(),
            growth_stage: "Vegetative".into(),
            temperature: 30.0,
            humidity: 70.0,
            coordinates: None,
            model: IdentifierModel::Detector,
            user_id: None,
        });
        record.analysis_status = status;
        record.image_path = image_path.map(str::to_string);
        record
    }

    fn service(fail_delete: bool) -> (HistoryService, MemoryRepository, Arc<FakeImages>) {
        let repo = MemoryRepository::new();
        let images = Arc::new(FakeImages {
            deleted: Mutex::new(Vec::new()),
            fail_delete,
        });
        (
            HistoryService::new(Arc::new(repo.clone()), images.clone()),
            repo,
            images,
        )
    }

    #[actix_web::test]
    async fn get_decodes_blocks() {
        let (service, repo, _) = service(false);
        let mut stored = record(AnalysisStatus::Success, None);
        let options = vec![HerbicideOption {
            name: "Metribuzin".into(),
            application_rate: "1.35 L/ha".into(),
            safe_for_tomato: "true".into(),
            mode_of_action: None,
            application_method: None,
            weather_constraints: "No specific constraints".into(),
            resistance_reported: "Unknown".into(),
            alternative_herbicide: None,
        }];
        stored.herbicide_options = Some(encode_block(&options).unwrap());
        repo.save(&stored).await.unwrap();

        let entry = service.get(&stored.id).await.unwrap();
        assert_eq!(entry.record.id, stored.id);
        assert_eq!(entry.parsed_herbicide_options, options);
        assert!(entry.parsed_safety_precautions.is_none());
    }

    #[actix_web::test]
    async fn unknown_id_is_not_found() {
        let (service, _, _) = service(false);
        assert!(matches!(service.get("nope").await, Err(AnalysisError::NotFound(_))));
        assert!(matches!(service.delete("nope").await, Err(AnalysisError::NotFound(_))));
    }

    #[actix_web::test]
    async fn delete_removes_record_and_image() {
        let (service, repo, images) = service(false);
        let stored = record(AnalysisStatus::Success, Some("uploads/herbicide-analysis/a.jpg"));
        repo.save(&stored).await.unwrap();

        service.delete(&stored.id).await.unwrap();
        assert!(repo.get(&stored.id).await.unwrap().is_none());
        assert_eq!(
            *images.deleted.lock().unwrap(),
            vec!["uploads/herbicide-analysis/a.jpg".to_string()]
        );
    }

    #[actix_web::test]
    async fn image_delete_failure_is_swallowed() {
        let (service, repo, images) = service(true);
        let stored = record(AnalysisStatus::Failed, Some("s3://bucket/images/2026/10/a.jpg"));
        repo.save(&stored).await.unwrap();

        service.delete(&stored.id).await.unwrap();
        assert!(repo.get(&stored.id).await.unwrap().is_none());
        assert_eq!(images.deleted.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn record_without_image_skips_image_store() {
        let (service, repo, images) = service(false);
        let stored = record(AnalysisStatus::Failed, None);
        repo.save(&stored).await.unwrap();

        service.delete(&stored.id).await.unwrap();
        assert!(images.deleted.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn statistics_count_by_status() {
        let (service, repo, _) = service(false);
        for status in [
            AnalysisStatus::Success,
            AnalysisStatus::Success,
            AnalysisStatus::Failed,
        ] {
            repo.save(&record(status, None)).await.unwrap();
        }

        let stats = service.statistics().await.unwrap();
        assert_eq!(
            stats,
            AnalysisStatistics {
                total_analyses: 3,
                successful_analyses: 2,
                failed_analyses: 1,
            }
        );
        assert_eq!(service.list().await.unwrap().len(), 3);
    }
}
