use shared::HerbicideAnalysisResponse;
use std::fmt;
use std::sync::Arc;

use super::recommendation::RecommendationBuilder;
use crate::db::AnalysisRecordStore;
use crate::error::AnalysisError;
use crate::identify::IdentifierSet;
use crate::models::{encode_block, AnalysisContext, AnalysisRecord};
use crate::predict::{FeatureSet, RatePredictor};
use crate::storage::{ImageStore, ImageUpload};
use crate::weather::{weather_constraints, WeatherEnricher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Created,
    ImageSaved,
    Identified,
    WeatherEnriched,
    RatePredicted,
    RecommendationBuilt,
    Persisted,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Created => "created",
            PipelineStage::ImageSaved => "image saved",
            PipelineStage::Identified => "identified",
            PipelineStage::WeatherEnriched => "weather enriched",
            PipelineStage::RatePredicted => "rate predicted",
            PipelineStage::RecommendationBuilt => "recommendation built",
            PipelineStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Runs one analysis from upload to persisted record.
///
/// Every call ends with exactly one terminal write of its record: SUCCESS
/// when the response is returned, FAILED (written before the error is
/// returned) otherwise.
#[derive(Clone)]
pub struct AnalysisService {
    images: Arc<dyn ImageStore>,
    identifiers: IdentifierSet,
    weather: WeatherEnricher,
    predictor: Arc<dyn RatePredictor>,
    recommendations: RecommendationBuilder,
    records: Arc<dyn AnalysisRecordStore>,
}

impl AnalysisService {
    pub fn new(
        images: Arc<dyn ImageStore>,
        identifiers: IdentifierSet,
        weather: WeatherEnricher,
        predictor: Arc<dyn RatePredictor>,
        recommendations: RecommendationBuilder,
        records: Arc<dyn AnalysisRecordStore>,
    ) -> Self {
        Self {
            images,
            identifiers,
            weather,
            predictor,
            recommendations,
            records,
        }
    }

    pub async fn analyze(
        &self,
        image: ImageUpload,
        context: AnalysisContext,
    ) -> Result<HerbicideAnalysisResponse, AnalysisError> {
        let mut record = AnalysisRecord::pending(&context);
        let mut stage = PipelineStage::Created;
        log::info!(
            "Starting herbicide analysis {} with {} identifier",
            record.id,
            context.model
        );

        let response = match self.run_stages(&image, &context, &mut record, &mut stage).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(record, stage, e).await),
        };

        record.mark_success();
        if let Err(e) = self.records.save(&record).await {
            return Err(self.fail(record, stage, AnalysisError::Persistence(e)).await);
        }
        stage = PipelineStage::Persisted;

        log::info!(
            "Herbicide analysis {} {} for weed: {} with confidence: {}%",
            record.id,
            stage,
            response.weed_name,
            response.confidence
        );
        Ok(response)
    }

    async fn run_stages(
        &self,
        image: &ImageUpload,
        context: &AnalysisContext,
        record: &mut AnalysisRecord,
        stage: &mut PipelineStage,
    ) -> Result<HerbicideAnalysisResponse, AnalysisError> {
        let image_path = self.images.save(image).await?;
        log::debug!("Analysis {} image stored at {}", record.id, image_path);
        record.image_path = Some(image_path);
        *stage = PipelineStage::ImageSaved;

        let identifier = self.identifiers.get(context.model).ok_or_else(|| {
            AnalysisError::InvalidRequest(format!("{} identifier is not configured", context.model))
        })?;
        let identification = identifier
            .identify(image)
            .await
            .map_err(AnalysisError::Identification)?;
        record.weed_name = Some(identification.weed_name.clone());
        record.confidence = Some(identification.confidence);
        record.detection_count = Some(identification.detection_info.detection_count);
        *stage = PipelineStage::Identified;

        let reading = self.weather.enrich(context.coordinates).await;
        let constraints = weather_constraints(reading.wind_speed, reading.rainfall);
        record.wind_speed = reading.wind_speed;
        record.rainfall = reading.rainfall;
        record.weather_constraints = Some(constraints.clone());
        *stage = PipelineStage::WeatherEnriched;

        let features = FeatureSet {
            weed_name: identification.weed_name.clone(),
            soil_type: context.soil_type.clone(),
            growth_stage: context.growth_stage.clone(),
            temperature: context.temperature,
            humidity: context.humidity,
            wind_speed: reading.wind_speed,
            rainfall: reading.rainfall,
        };
        let prediction = self
            .predictor
            .predict(&features)
            .await
            .map_err(AnalysisError::Prediction)?;
        record.predicted_herbicide_name = prediction.predicted_herbicide_name.clone();
        record.predicted_application_rate = prediction.predicted_application_rate;
        *stage = PipelineStage::RatePredicted;

        let recommendation = self
            .recommendations
            .build(
                prediction.predicted_herbicide_name.as_deref(),
                prediction.predicted_application_rate,
                &constraints,
            )
            .await
            .map_err(AnalysisError::KnowledgeStore)?;
        if let Some(safety) = &recommendation.safety_precautions {
            record.safety_precautions = Some(encode_block(safety)?);
        }
        record.herbicide_options = Some(encode_block(&recommendation.options)?);
        *stage = PipelineStage::RecommendationBuilt;

        Ok(HerbicideAnalysisResponse {
            id: record.id.clone(),
            weed_name: identification.weed_name,
            confidence: identification.confidence,
            soil_type: context.soil_type.clone(),
            growth_stage: context.growth_stage.clone(),
            temperature: context.temperature,
            humidity: context.humidity,
            rainfall: reading.rainfall,
            wind_speed: reading.wind_speed,
            weather_constraints: constraints,
            predicted_application_rate: prediction.predicted_application_rate,
            predicted_herbicide_name: prediction.predicted_herbicide_name,
            herbicide_options: recommendation.options,
            safety_precautions: recommendation.safety_precautions,
            detection_info: identification.detection_info,
        })
    }

    /// Writes the FAILED record, then hands back the error to re-raise.
    async fn fail(
        &self,
        mut record: AnalysisRecord,
        stage: PipelineStage,
        error: AnalysisError,
    ) -> AnalysisError {
        log::error!(
            "Herbicide analysis {} failed after stage '{}': {}",
            record.id,
            stage,
            error
        );
        record.mark_failed(error.to_string());
        if let Err(e) = self.records.save(&record).await {
            log::error!(
                "Failed to persist FAILED record {}: {}",
                record.id,
                e
            );
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_repository::MemoryRepository;
    use crate::db::{HerbicideStore, RepositoryError};
    use crate::error::UpstreamError;
    use crate::identify::{classifier_client::ClassifierResponse, Identification, WeedIdentifier};
    use crate::models::{decode_block, Coordinates, HerbicideEntry};
    use crate::predict::RatePrediction;
    use crate::storage::StorageError;
    use crate::weather::{WeatherProvider, WeatherReading};
    use async_trait::async_trait;
    use shared::{
        AnalysisStatus, BoundingBox, Detection, DetectionInfo, HerbicideOption, IdentifierModel,
        SafetyPrecautions,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeImages {
        fail: bool,
    }

    #[async_trait]
    impl ImageStore for FakeImages {
        async fn save(&self, _upload: &ImageUpload) -> Result<String, StorageError> {
            if self.fail {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            Ok("uploads/herbicide-analysis/test.jpg".to_string())
        }

        async fn delete(&self, _location: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    struct FakeIdentifier {
        model: IdentifierModel,
        result: Result<Identification, &'static str>,
    }

    #[async_trait]
    impl WeedIdentifier for FakeIdentifier {
        fn model(&self) -> IdentifierModel {
            self.model
        }

        async fn identify(&self, _image: &ImageUpload) -> Result<Identification, UpstreamError> {
            self.result.clone().map_err(|reason| UpstreamError::InvalidPayload {
                service: "weed classifier",
                reason: reason.to_string(),
            })
        }
    }

    struct FakeWeather {
        calls: AtomicUsize,
        reading: Option<WeatherReading>,
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn current(&self, _coordinates: Coordinates) -> Result<WeatherReading, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reading.ok_or_else(|| UpstreamError::Status {
                service: "weather provider",
                status: 500,
                body: String::new(),
            })
        }
    }

    struct FakePredictor {
        result: Result<RatePrediction, u16>,
        seen: Mutex<Option<FeatureSet>>,
    }

    #[async_trait]
    impl RatePredictor for FakePredictor {
        async fn predict(&self, features: &FeatureSet) -> Result<RatePrediction, UpstreamError> {
            *self.seen.lock().unwrap() = Some(features.clone());
            self.result.clone().map_err(|status| UpstreamError::Status {
                service: "rate predictor",
                status,
                body: "could not convert None to float".into(),
            })
        }
    }

    /// Counts writes and can be told to reject SUCCESS writes.
    struct CountingRecords {
        inner: MemoryRepository,
        writes: Mutex<Vec<AnalysisStatus>>,
        reject_success: bool,
    }

    #[async_trait]
    impl AnalysisRecordStore for CountingRecords {
        async fn save(&self, record: &AnalysisRecord) -> Result<String, RepositoryError> {
            self.writes.lock().unwrap().push(record.analysis_status);
            if self.reject_success && record.analysis_status == AnalysisStatus::Success {
                return Err(RepositoryError::DynamoDb("throttled".into()));
            }
            self.inner.save(record).await
        }

        async fn get(&self, id: &str) -> Result<Option<AnalysisRecord>, RepositoryError> {
            self.inner.get(id).await
        }

        async fn list_recent(&self) -> Result<Vec<AnalysisRecord>, RepositoryError> {
            self.inner.list_recent().await
        }

        async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
            self.inner.delete(id).await
        }
    }

    struct UnreachableKnowledge;

    #[async_trait]
    impl HerbicideStore for UnreachableKnowledge {
        async fn find_by_name(&self, _name: &str) -> Result<Option<HerbicideEntry>, RepositoryError> {
            Err(RepositoryError::DynamoDb("ResourceNotFoundException".into()))
        }
    }

    struct Harness {
        images_fail: bool,
        knowledge_fails: bool,
        legacy: Result<Identification, &'static str>,
        detector: Result<Identification, &'static str>,
        weather: Option<WeatherReading>,
        prediction: Result<RatePrediction, u16>,
        reject_success: bool,
    }

    impl Default for Harness {
        fn default() -> Self {
            Self {
                images_fail: false,
                knowledge_fails: false,
                legacy: Ok(ClassifierResponse {
                    weed_type: Some("black_nightshade".into()),
                    confidence: Some(0.82),
                }
                .into_identification()),
                detector: Ok(two_detections()),
                weather: Some(WeatherReading {
                    wind_speed: Some(3.0),
                    rainfall: 0.0,
                }),
                prediction: Ok(RatePrediction {
                    predicted_herbicide_name: Some("Glyphosate-A".into()),
                    predicted_application_rate: Some(2.0),
                }),
                reject_success: false,
            }
        }
    }

    struct Built {
        service: AnalysisService,
        records: Arc<CountingRecords>,
        weather: Arc<FakeWeather>,
        predictor: Arc<FakePredictor>,
    }

    impl Harness {
        fn build(self) -> Built {
            let knowledge = MemoryRepository::with_herbicides(vec![
                HerbicideEntry {
                    name: "Glyphosate-A".into(),
                    safe_for_tomato: Some(false),
                    mode_of_action: Some("EPSP synthase inhibitor".into()),
                    application_method: Some("Spot spray".into()),
                    resistance_reported: Some(true),
                    alternative_herbicide: Some("Glyphosate-B".into()),
                    toxicity: Some("Moderate".into()),
                    human_protection: Some("Gloves".into()),
                    environmental_precautions: Some("Keep from waterways".into()),
                },
                HerbicideEntry {
                    name: "Glyphosate-B".into(),
                    safe_for_tomato: None,
                    mode_of_action: None,
                    application_method: None,
                    resistance_reported: None,
                    alternative_herbicide: Some("Glyphosate-A".into()),
                    toxicity: None,
                    human_protection: None,
                    environmental_precautions: None,
                },
            ]);
            let knowledge: Arc<dyn HerbicideStore> = if self.knowledge_fails {
                Arc::new(UnreachableKnowledge)
            } else {
                Arc::new(knowledge)
            };
            let records = Arc::new(CountingRecords {
                inner: MemoryRepository::new(),
                writes: Mutex::new(Vec::new()),
                reject_success: self.reject_success,
            });
            let weather = Arc::new(FakeWeather {
                calls: AtomicUsize::new(0),
                reading: self.weather,
            });
            let predictor = Arc::new(FakePredictor {
                result: self.prediction,
                seen: Mutex::new(None),
            });
            let identifiers = IdentifierSet::new()
                .with(Arc::new(FakeIdentifier {
                    model: IdentifierModel::Legacy,
                    result: self.legacy,
                }))
                .with(Arc::new(FakeIdentifier {
                    model: IdentifierModel::Detector,
                    result: self.detector,
                }));
            let service = AnalysisService::new(
                Arc::new(FakeImages {
                    fail: self.images_fail,
                }),
                identifiers,
                WeatherEnricher::new(weather.clone()),
                predictor.clone(),
                RecommendationBuilder::new(knowledge),
                records.clone(),
            );
            Built {
                service,
                records,
                weather,
                predictor,
            }
        }
    }

    fn two_detections() -> Identification {
        let bbox = BoundingBox {
            x1: 1.0,
            y1: 2.0,
            x2: 11.0,
            y2: 12.0,
            width: 10.0,
            height: 10.0,
        };
        Identification {
            weed_name: "Bindweed".into(),
            confidence: 65.0,
            detection_info: DetectionInfo {
                detection_count: 2,
                detections: vec![
                    Detection {
                        bbox: Some(bbox),
                        class_id: 2,
                        class_name: "Bindweed".into(),
                        confidence: 0.65,
                    },
                    Detection {
                        bbox: Some(bbox),
                        class_id: 4,
                        class_name: "Purslane".into(),
                        confidence: 0.4,
                    },
                ],
                model_used: IdentifierModel::Detector,
            },
        }
    }

    fn image() -> ImageUpload {
        ImageUpload {
            bytes: vec![0xFF, 0xD8, 0xFF],
            file_name: Some("plot.jpg".into()),
            content_type: Some("image/jpeg".into()),
        }
    }

    fn context(model: IdentifierModel, coordinates: Option<Coordinates>) -> AnalysisContext {
        AnalysisContext {
            soil_type: "Loam".into(),
            growth_stage: "Seedling".into(),
            temperature: 26.0,
            humidity: 65.0,
            coordinates,
            model,
            user_id: None,
        }
    }

    fn somewhere() -> Option<Coordinates> {
        Some(Coordinates {
            latitude: 7.2906,
            longitude: 80.6337,
        })
    }

    async fn only_record(records: &CountingRecords) -> AnalysisRecord {
        let mut all = records.list_recent().await.unwrap();
        assert_eq!(all.len(), 1);
        all.remove(0)
    }

    #[actix_web::test]
    async fn legacy_success_persists_once() {
        let built = Harness::default().build();
        let response = built
            .service
            .analyze(image(), context(IdentifierModel::Legacy, somewhere()))
            .await
            .unwrap();

        assert!((response.confidence - 82.0).abs() < 1e-9);
        assert_eq!(response.detection_info.detection_count, 1);
        let bbox = response.detection_info.detections[0].bbox.unwrap();
        assert_eq!(((bbox.x1 + bbox.x2) / 2.0, (bbox.y1 + bbox.y2) / 2.0), (320.0, 240.0));
        assert_eq!((bbox.width, bbox.height), (256.0, 192.0));
        assert_eq!(response.weather_constraints, "Low wind, favorable");
        assert_eq!(*built.records.writes.lock().unwrap(), vec![AnalysisStatus::Success]);

        let record = only_record(&built.records).await;
        assert_eq!(record.id, response.id);
        assert_eq!(record.analysis_status, AnalysisStatus::Success);
        assert_eq!(record.model_used, IdentifierModel::Legacy);
        assert_eq!(record.detection_count, Some(1));
        assert_eq!(record.image_path.as_deref(), Some("uploads/herbicide-analysis/test.jpg"));
        assert_eq!(record.wind_speed, Some(3.0));
        assert!(record.error_message.is_none());
    }

    #[actix_web::test]
    async fn detector_primary_detection_drives_prediction() {
        let built = Harness::default().build();
        let response = built
            .service
            .analyze(image(), context(IdentifierModel::Detector, somewhere()))
            .await
            .unwrap();

        assert_eq!(response.weed_name, "Bindweed");
        assert_eq!(response.confidence, 65.0);
        assert_eq!(response.detection_info.detection_count, 2);
        let seen = built.predictor.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.weed_name, "Bindweed");
        assert_eq!(seen.wind_speed, Some(3.0));

        let record = only_record(&built.records).await;
        assert_eq!(record.model_used, IdentifierModel::Detector);
        assert_eq!(record.detection_count, Some(2));
    }

    #[actix_web::test]
    async fn missing_coordinates_skip_weather() {
        let built = Harness::default().build();
        let response = built
            .service
            .analyze(image(), context(IdentifierModel::Legacy, None))
            .await
            .unwrap();

        assert_eq!(built.weather.calls.load(Ordering::SeqCst), 0);
        assert_eq!(response.wind_speed, None);
        assert_eq!(response.rainfall, 0.0);
        assert_eq!(response.weather_constraints, "No specific constraints");
        let seen = built.predictor.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.wind_speed, None);
    }

    #[actix_web::test]
    async fn weather_failure_is_soft() {
        let built = Harness {
            weather: None,
            ..Harness::default()
        }
        .build();
        let response = built
            .service
            .analyze(image(), context(IdentifierModel::Legacy, somewhere()))
            .await
            .unwrap();

        assert_eq!(built.weather.calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.wind_speed, None);
        assert_eq!(response.weather_constraints, "No specific constraints");
        assert_eq!(only_record(&built.records).await.analysis_status, AnalysisStatus::Success);
    }

    #[actix_web::test]
    async fn recommendation_includes_alternative_and_blocks() {
        let built = Harness::default().build();
        let response = built
            .service
            .analyze(image(), context(IdentifierModel::Legacy, None))
            .await
            .unwrap();

        let rates: Vec<(&str, &str)> = response
            .herbicide_options
            .iter()
            .map(|o| (o.name.as_str(), o.application_rate.as_str()))
            .collect();
        assert_eq!(rates, vec![("Glyphosate-A", "2.0 L/ha"), ("Glyphosate-B", "1.8 L/ha")]);
        assert_eq!(
            response.safety_precautions.as_ref().unwrap().toxicity.as_deref(),
            Some("Moderate")
        );

        let record = only_record(&built.records).await;
        let options: Vec<HerbicideOption> =
            decode_block(record.herbicide_options.as_deref().unwrap()).unwrap();
        assert_eq!(options, response.herbicide_options);
        let safety: SafetyPrecautions =
            decode_block(record.safety_precautions.as_deref().unwrap()).unwrap();
        assert_eq!(Some(safety), response.safety_precautions);
    }

    #[actix_web::test]
    async fn empty_prediction_still_succeeds() {
        let built = Harness {
            prediction: Ok(RatePrediction::default()),
            ..Harness::default()
        }
        .build();
        let response = built
            .service
            .analyze(image(), context(IdentifierModel::Legacy, None))
            .await
            .unwrap();

        assert!(response.herbicide_options.is_empty());
        assert!(response.safety_precautions.is_none());
        let record = only_record(&built.records).await;
        assert_eq!(record.analysis_status, AnalysisStatus::Success);
        assert!(record.predicted_herbicide_name.is_none());
        assert!(record.safety_precautions.is_none());
    }

    #[actix_web::test]
    async fn predictor_error_fails_and_records() {
        let built = Harness {
            prediction: Err(400),
            ..Harness::default()
        }
        .build();
        let err = built
            .service
            .analyze(image(), context(IdentifierModel::Legacy, None))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Prediction(_)));
        assert_eq!(*built.records.writes.lock().unwrap(), vec![AnalysisStatus::Failed]);
        let record = only_record(&built.records).await;
        assert_eq!(record.analysis_status, AnalysisStatus::Failed);
        assert!(!record.error_message.as_deref().unwrap_or("").is_empty());
        assert_eq!(record.weed_name.as_deref(), Some("black_nightshade"));
        assert!(record.image_path.is_some());
    }

    #[actix_web::test]
    async fn identification_error_fails_and_records() {
        let built = Harness {
            detector: Err("connection reset while reading detector reply"),
            ..Harness::default()
        }
        .build();
        let err = built
            .service
            .analyze(image(), context(IdentifierModel::Detector, somewhere()))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Identification(_)));
        assert_eq!(built.weather.calls.load(Ordering::SeqCst), 0);
        let record = only_record(&built.records).await;
        assert_eq!(record.analysis_status, AnalysisStatus::Failed);
        assert!(record.error_message.unwrap().contains("connection reset"));
        assert!(record.weed_name.is_none());
        assert_eq!(record.image_path.as_deref(), Some("uploads/herbicide-analysis/test.jpg"));
    }

    #[actix_web::test]
    async fn knowledge_lookup_error_fails_and_records() {
        let built = Harness {
            knowledge_fails: true,
            ..Harness::default()
        }
        .build();
        let err = built
            .service
            .analyze(image(), context(IdentifierModel::Legacy, None))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::KnowledgeStore(_)));
        assert_eq!(*built.records.writes.lock().unwrap(), vec![AnalysisStatus::Failed]);
        let record = only_record(&built.records).await;
        assert_eq!(record.analysis_status, AnalysisStatus::Failed);
        assert_eq!(record.predicted_herbicide_name.as_deref(), Some("Glyphosate-A"));
        assert_eq!(record.predicted_application_rate, Some(2.0));
        assert!(record.herbicide_options.is_none());
        assert!(record.error_message.unwrap().contains("ResourceNotFoundException"));
    }

    #[actix_web::test]
    async fn storage_error_fails_without_image_path() {
        let built = Harness {
            images_fail: true,
            ..Harness::default()
        }
        .build();
        let err = built
            .service
            .analyze(image(), context(IdentifierModel::Legacy, None))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Storage(_)));
        let record = only_record(&built.records).await;
        assert_eq!(record.analysis_status, AnalysisStatus::Failed);
        assert!(record.image_path.is_none());
    }

    #[actix_web::test]
    async fn rejected_success_write_is_recorded_as_failure() {
        let built = Harness {
            reject_success: true,
            ..Harness::default()
        }
        .build();
        let err = built
            .service
            .analyze(image(), context(IdentifierModel::Legacy, None))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Persistence(_)));
        assert_eq!(
            *built.records.writes.lock().unwrap(),
            vec![AnalysisStatus::Success, AnalysisStatus::Failed]
        );
        let record = only_record(&built.records).await;
        assert_eq!(record.analysis_status, AnalysisStatus::Failed);
    }

    #[actix_web::test]
    async fn no_record_is_left_pending() {
        let harnesses = vec![
            Harness::default(),
            Harness {
                images_fail: true,
                ..Harness::default()
            },
            Harness {
                legacy: Err("timeout"),
                ..Harness::default()
            },
            Harness {
                weather: None,
                ..Harness::default()
            },
            Harness {
                prediction: Err(502),
                ..Harness::default()
            },
            Harness {
                knowledge_fails: true,
                ..Harness::default()
            },
            Harness {
                prediction: Ok(RatePrediction::default()),
                ..Harness::default()
            },
        ];
        for harness in harnesses {
            let built = harness.build();
            let _ = built
                .service
                .analyze(image(), context(IdentifierModel::Legacy, somewhere()))
                .await;
            let record = only_record(&built.records).await;
            assert!(record.analysis_status.is_terminal());
            assert_eq!(built.records.writes.lock().unwrap().len(), 1);
        }
    }
}
