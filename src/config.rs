use crate::error::AppError;
use serde::Deserialize;
use config::{Config, Environment, File};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub engine: String,
    pub elasticsearch_url: String,
    #[serde(default)]
    pub elasticsearch_username: Option<String>,
    #[serde(default)]
    pub elasticsearch_password: Option<String>,
    pub tantivy_index_path: String,
    pub storage_endpoint: String,
    pub detection_endpoint: String,
    pub nlu_endpoint: String,
    pub nlu_bot_id: String,
    pub nlu_bot_alias_id: String,
    #[serde(default = "default_locale")]
    pub nlu_locale: String,
    #[serde(default = "default_ingest_concurrency")]
    pub ingest_concurrency: usize,
    #[serde(default = "default_collaborator_timeout_secs")]
    pub collaborator_timeout_secs: u64,
    #[serde(default = "default_record_timeout_secs")]
    pub record_timeout_secs: u64,
    pub web_port: u16,
    pub log_level: String,
}

fn default_locale() -> String {
    "en_US".to_string()
}

fn default_ingest_concurrency() -> usize {
    8
}

fn default_collaborator_timeout_secs() -> u64 {
    30
}

fn default_record_timeout_secs() -> u64 {
    90
}

impl AppConfig {
    pub fn new() -> Result<Self, AppError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PHOTO_INDEXER").try_parsing(true))
            .build()?;

        Ok(s.try_deserialize()?)
    }

    /// Per-request limit for the storage, detection and NLU clients.
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }

    pub fn record_timeout(&self) -> Duration {
        Duration::from_secs(self.record_timeout_secs)
    }
}
