mod analysis;
mod config;
mod db;
mod error;
mod identify;
mod models;
mod predict;
mod routes;
mod storage;
mod upstream;
mod weather;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use analysis::history_service::HistoryService;
use analysis::pipeline::AnalysisService;
use analysis::recommendation::RecommendationBuilder;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use config::{AppConfig, PersistenceBackend, StorageBackend};
use db::dynamodb_repository::DynamoDbRepository;
use db::memory_repository::MemoryRepository;
use db::{AnalysisRecordStore, HerbicideStore};
use identify::classifier_client::ClassifierClient;
use identify::detector_client::DetectorClient;
use identify::IdentifierSet;
use predict::rate_client::RatePredictorClient;
use routes::{configure_routes, UploadLimit};
use std::io;
use std::sync::Arc;
use storage::local_service::LocalImageStore;
use storage::s3_service::S3ImageStore;
use storage::ImageStore;
use weather::openweather_client::OpenWeatherClient;
use weather::WeatherEnricher;

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, e);
    io::Error::other(format!("{}: {}", context, e))
}

async fn build_stores(
    config: &AppConfig,
) -> io::Result<(Arc<dyn HerbicideStore>, Arc<dyn AnalysisRecordStore>)> {
    match config.persistence.backend {
        PersistenceBackend::Memory => {
            let repo = match &config.persistence.herbicide_seed {
                Some(path) => MemoryRepository::from_seed_file(path)
                    .await
                    .map_err(|e| startup_error("Failed to load herbicide seed", e))?,
                None => {
                    log::warn!("No herbicide seed configured; knowledge store is empty");
                    MemoryRepository::new()
                }
            };
            log::info!("Using in-memory persistence");
            let herbicides: Arc<dyn HerbicideStore> = Arc::new(repo.clone());
            let records: Arc<dyn AnalysisRecordStore> = Arc::new(repo);
            Ok((herbicides, records))
        }
        PersistenceBackend::DynamoDb => {
            let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            let records_table = config
                .persistence
                .records_table
                .clone()
                .unwrap_or_default();
            let herbicides_table = config
                .persistence
                .herbicides_table
                .clone()
                .unwrap_or_default();
            let repo = DynamoDbRepository::new(
                DynamoDbClient::new(&aws_config),
                records_table,
                herbicides_table,
            );
            repo.verify_tables()
                .await
                .map_err(|e| startup_error("DynamoDB tables are not reachable", e))?;
            log::info!("Using DynamoDB persistence");
            let herbicides: Arc<dyn HerbicideStore> = Arc::new(repo.clone());
            let records: Arc<dyn AnalysisRecordStore> = Arc::new(repo);
            Ok((herbicides, records))
        }
    }
}

async fn build_image_store(config: &AppConfig) -> Arc<dyn ImageStore> {
    match config.storage.backend {
        StorageBackend::Local => {
            log::info!("Storing images under {}", config.storage.upload_dir.display());
            Arc::new(LocalImageStore::new(
                config.storage.upload_dir.clone(),
                config.storage.max_image_bytes,
            ))
        }
        StorageBackend::S3 => {
            let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            let bucket = config.storage.s3_bucket.clone().unwrap_or_default();
            log::info!("Storing images in S3 bucket {}", bucket);
            Arc::new(S3ImageStore::new(
                S3Client::new(&aws_config),
                bucket,
                config.storage.max_image_bytes,
            ))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = AppConfig::load().map_err(|e| startup_error("Failed to load configuration", e))?;
    config
        .validate()
        .map_err(|e| startup_error("Invalid configuration", e))?;

    let http_client = reqwest::Client::builder()
        .connect_timeout(config.timeouts.connect())
        .build()
        .map_err(|e| startup_error("Failed to build HTTP client", e))?;

    let identifiers = IdentifierSet::new()
        .with(Arc::new(ClassifierClient::new(
            http_client.clone(),
            config.upstream.classifier_url.clone(),
            config.timeouts.classifier(),
        )))
        .with(Arc::new(DetectorClient::new(
            http_client.clone(),
            config.upstream.detector_url.clone(),
            config.timeouts.detector(),
        )));
    let weather = WeatherEnricher::new(Arc::new(OpenWeatherClient::new(
        http_client.clone(),
        config.upstream.weather_url.clone(),
        config.upstream.weather_api_key.clone(),
        config.timeouts.weather(),
    )));
    let predictor = Arc::new(RatePredictorClient::new(
        http_client,
        config.upstream.predictor_url.clone(),
        config.timeouts.predictor(),
    ));

    let (herbicides, records) = build_stores(&config).await?;
    let images = build_image_store(&config).await;

    let analysis_service = AnalysisService::new(
        images.clone(),
        identifiers,
        weather.clone(),
        predictor,
        RecommendationBuilder::new(herbicides),
        records.clone(),
    );
    let history_service = HistoryService::new(records, images);

    let bind_address = config.bind_address();
    let cors_max_age = config.server.cors_max_age_secs;
    let upload_limit = UploadLimit {
        max_image_bytes: config.storage.max_image_bytes,
    };
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(cors_max_age),
            )
            .app_data(web::Data::new(analysis_service.clone()))
            .app_data(web::Data::new(history_service.clone()))
            .app_data(web::Data::new(weather.clone()))
            .app_data(web::Data::new(upload_limit))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
