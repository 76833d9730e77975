//! Configuration module
//!
//! Settings are read from the environment (a `.env` file is honoured through `dotenvy`).
//! [`Config`] wraps the full [`PipelineConfig`] and exposes getters so call sites do not
//! depend on the struct layout.

use std::collections::BTreeMap;
use std::env;

use crate::storage_types::{BusBackend, LogFormat, StorageBackend};

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: usize = 10;
const THUMBNAIL_WIDTH: u32 = 200;
const THUMBNAIL_HEIGHT: u32 = 200;
const MEDIA_PREFIX: &str = "media";
const WORKER_POLL_INTERVAL_MS: u64 = 1000;
const WORKER_BATCH_SIZE: usize = 10;
const BUS_MAX_DELIVERIES: u32 = 5;

/// Settings shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: LogFormat,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
}

/// Media pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub base: BaseConfig,
    /// Absent means the in-memory record store is used.
    pub database_url: Option<String>,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, LocalStack, ...)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub media_prefix: String,
    /// Prepended verbatim to storage keys when listing.
    pub static_url: String,
    // Media processing configuration
    pub max_file_size_bytes: usize,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    // Event bus configuration
    pub bus_backend: BusBackend,
    pub sns_topic_arn: Option<String>,
    /// Subscription name -> SQS queue URL
    pub queue_urls: BTreeMap<String, String>,
    pub bus_max_deliveries: u32,
    // Worker configuration
    pub worker_enabled: bool,
    pub worker_poll_interval_ms: u64,
    pub worker_batch_size: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<PipelineConfig>);

impl Config {
    fn as_pipeline(&self) -> &PipelineConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.as_pipeline().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = PipelineConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_pipeline().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_pipeline().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_pipeline().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_pipeline().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_pipeline().base.log_format
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_pipeline().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_pipeline().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_pipeline().database_url.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_pipeline().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_pipeline().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_pipeline().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_pipeline().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_pipeline().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_pipeline().local_storage_path.as_deref()
    }

    pub fn media_prefix(&self) -> &str {
        &self.as_pipeline().media_prefix
    }

    pub fn static_url(&self) -> &str {
        &self.as_pipeline().static_url
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.as_pipeline().max_file_size_bytes
    }

    pub fn thumbnail_width(&self) -> u32 {
        self.as_pipeline().thumbnail_width
    }

    pub fn thumbnail_height(&self) -> u32 {
        self.as_pipeline().thumbnail_height
    }

    pub fn bus_backend(&self) -> BusBackend {
        self.as_pipeline().bus_backend
    }

    pub fn sns_topic_arn(&self) -> Option<&str> {
        self.as_pipeline().sns_topic_arn.as_deref()
    }

    pub fn queue_url(&self, subscription: &str) -> Option<&str> {
        self.as_pipeline()
            .queue_urls
            .get(subscription)
            .map(String::as_str)
    }

    pub fn bus_max_deliveries(&self) -> u32 {
        self.as_pipeline().bus_max_deliveries
    }

    pub fn worker_enabled(&self) -> bool {
        self.as_pipeline().worker_enabled
    }

    pub fn worker_poll_interval_ms(&self) -> u64 {
        self.as_pipeline().worker_poll_interval_ms
    }

    pub fn worker_batch_size(&self) -> usize {
        self.as_pipeline().worker_batch_size
    }
}

fn is_production_name(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// `SQS_THUMBNAIL_QUEUE_URL` -> `thumbnail`, `SQS_RECORD_WRITER_QUEUE_URL` -> `record-writer`.
fn queue_urls_from_env() -> BTreeMap<String, String> {
    env::vars()
        .filter_map(|(key, value)| {
            let name = key.strip_prefix("SQS_")?.strip_suffix("_QUEUE_URL")?;
            if name.is_empty() || value.trim().is_empty() {
                return None;
            }
            Some((name.to_lowercase().replace('_', "-"), value))
        })
        .collect()
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_format = env::var("LOG_FORMAT")
            .ok()
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            log_format,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
        };

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<StorageBackend>()?;

        let bus_backend = env::var("BUS_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .parse::<BusBackend>()?;

        let max_file_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        Ok(PipelineConfig {
            base,
            database_url: optional_var("DATABASE_URL"),
            storage_backend,
            s3_bucket: optional_var("S3_BUCKET").or_else(|| optional_var("MEDIA_BUCKET")),
            s3_region: optional_var("S3_REGION"),
            s3_endpoint: optional_var("S3_ENDPOINT"),
            aws_region: optional_var("AWS_REGION"),
            local_storage_path: optional_var("LOCAL_STORAGE_PATH")
                .or_else(|| Some("./data/media".to_string())),
            media_prefix: env::var("MEDIA_PREFIX").unwrap_or_else(|_| MEDIA_PREFIX.to_string()),
            static_url: env::var("STATIC_URL").unwrap_or_default(),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            thumbnail_width: env::var("THUMBNAIL_WIDTH")
                .unwrap_or_else(|_| THUMBNAIL_WIDTH.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("THUMBNAIL_WIDTH must be a positive integer"))?,
            thumbnail_height: env::var("THUMBNAIL_HEIGHT")
                .unwrap_or_else(|_| THUMBNAIL_HEIGHT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("THUMBNAIL_HEIGHT must be a positive integer"))?,
            bus_backend,
            sns_topic_arn: optional_var("SNS_TOPIC_ARN"),
            queue_urls: queue_urls_from_env(),
            bus_max_deliveries: env::var("BUS_MAX_DELIVERIES")
                .unwrap_or_else(|_| BUS_MAX_DELIVERIES.to_string())
                .parse()
                .unwrap_or(BUS_MAX_DELIVERIES),
            worker_enabled: env::var("WORKER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            worker_poll_interval_ms: env::var("WORKER_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| WORKER_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(WORKER_POLL_INTERVAL_MS),
            worker_batch_size: env::var("WORKER_BATCH_SIZE")
                .unwrap_or_else(|_| WORKER_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(WORKER_BATCH_SIZE),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.thumbnail_width == 0 || self.thumbnail_height == 0 {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_WIDTH and THUMBNAIL_HEIGHT must be greater than zero"
            ));
        }

        if self.worker_batch_size == 0 {
            return Err(anyhow::anyhow!("WORKER_BATCH_SIZE must be greater than zero"));
        }

        if let Some(ref url) = self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET (or MEDIA_BUCKET) must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        if self.bus_backend == BusBackend::Aws && self.sns_topic_arn.is_none() {
            return Err(anyhow::anyhow!(
                "SNS_TOPIC_ARN must be set when using the aws event bus"
            ));
        }

        Ok(())
    }
}
