use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "HERBICIDE_CONFIG";
const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Timeout {0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub timeouts: TimeoutConfig,
    pub storage: StorageConfig,
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub cors_max_age_secs: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8081,
            cors_max_age_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub classifier_url: String,
    pub detector_url: String,
    pub predictor_url: String,
    pub weather_url: String,
    pub weather_api_key: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            classifier_url: String::new(),
            detector_url: String::new(),
            predictor_url: String::new(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            weather_api_key: String::new(),
        }
    }
}

/// Per-call timeouts, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_ms: u64,
    pub classifier_ms: u64,
    pub detector_ms: u64,
    pub weather_ms: u64,
    pub predictor_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 5_000,
            classifier_ms: 30_000,
            detector_ms: 60_000,
            weather_ms: 10_000,
            predictor_ms: 30_000,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn classifier(&self) -> Duration {
        Duration::from_millis(self.classifier_ms)
    }

    pub fn detector(&self) -> Duration {
        Duration::from_millis(self.detector_ms)
    }

    pub fn weather(&self) -> Duration {
        Duration::from_millis(self.weather_ms)
    }

    pub fn predictor(&self) -> Duration {
        Duration::from_millis(self.predictor_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub upload_dir: PathBuf,
    pub s3_bucket: Option<String>,
    pub max_image_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            upload_dir: PathBuf::from("uploads/herbicide-analysis"),
            s3_bucket: None,
            max_image_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    #[default]
    Memory,
    DynamoDb,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub backend: PersistenceBackend,
    pub records_table: Option<String>,
    pub herbicides_table: Option<String>,
    pub herbicide_seed: Option<PathBuf>,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl AppConfig {
    /// Reads the YAML file named by `HERBICIDE_CONFIG` (if set), then applies
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overrides fields from `lookup`, which maps an environment variable
    /// name to its value. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_empty);

        if let Some(port) = get("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(url) = get("CLASSIFIER_API_URL") {
            self.upstream.classifier_url = url;
        }
        if let Some(url) = get("DETECTOR_API_URL") {
            self.upstream.detector_url = url;
        }
        if let Some(url) = get("PREDICTOR_API_URL") {
            self.upstream.predictor_url = url;
        }
        if let Some(url) = get("WEATHER_API_URL") {
            self.upstream.weather_url = url;
        }
        if let Some(key) = get("WEATHER_API_KEY") {
            self.upstream.weather_api_key = key;
        }
        if let Some(backend) = get("IMAGE_STORAGE") {
            self.storage.backend = match backend.to_ascii_lowercase().as_str() {
                "local" => StorageBackend::Local,
                "s3" => StorageBackend::S3,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "IMAGE_STORAGE",
                        value: backend,
                    });
                }
            };
        }
        if let Some(dir) = get("UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(dir);
        }
        if let Some(bucket) = get("S3_BUCKET_NAME") {
            self.storage.s3_bucket = Some(bucket);
        }
        if let Some(backend) = get("PERSISTENCE_BACKEND") {
            self.persistence.backend = match backend.to_ascii_lowercase().as_str() {
                "memory" => PersistenceBackend::Memory,
                "dynamodb" => PersistenceBackend::DynamoDb,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PERSISTENCE_BACKEND",
                        value: backend,
                    });
                }
            };
        }
        if let Some(table) = get("DYNAMODB_RECORDS_TABLE") {
            self.persistence.records_table = Some(table);
        }
        if let Some(table) = get("DYNAMODB_HERBICIDES_TABLE") {
            self.persistence.herbicides_table = Some(table);
        }
        if let Some(path) = get("HERBICIDE_SEED_PATH") {
            self.persistence.herbicide_seed = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("CLASSIFIER_API_URL", &self.upstream.classifier_url),
            ("DETECTOR_API_URL", &self.upstream.detector_url),
            ("PREDICTOR_API_URL", &self.upstream.predictor_url),
            ("WEATHER_API_URL", &self.upstream.weather_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(key));
            }
            url::Url::parse(value).map_err(|_| ConfigError::InvalidValue {
                key,
                value: value.clone(),
            })?;
        }

        for (name, value) in [
            ("connect_ms", self.timeouts.connect_ms),
            ("classifier_ms", self.timeouts.classifier_ms),
            ("detector_ms", self.timeouts.detector_ms),
            ("weather_ms", self.timeouts.weather_ms),
            ("predictor_ms", self.timeouts.predictor_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }

        if self.storage.backend == StorageBackend::S3 && self.storage.s3_bucket.is_none() {
            return Err(ConfigError::Missing("S3_BUCKET_NAME"));
        }
        if self.persistence.backend == PersistenceBackend::DynamoDb {
            if self.persistence.records_table.is_none() {
                return Err(ConfigError::Missing("DYNAMODB_RECORDS_TABLE"));
            }
            if self.persistence.herbicides_table.is_none() {
                return Err(ConfigError::Missing("DYNAMODB_HERBICIDES_TABLE"));
            }
        }
        if self.upstream.weather_api_key.is_empty() {
            log::warn!("WEATHER_API_KEY is not set; weather lookups will fail and be skipped");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
