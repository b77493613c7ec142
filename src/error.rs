use tokio::task::JoinError;
use elasticsearch::Error as ElasticsearchError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use tantivy::TantivyError;
use actix_web::{HttpResponse, ResponseError, http::{header, StatusCode}};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Elasticsearch error: {0}")]
    Elasticsearch(#[from] ElasticsearchError),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    #[error("Search engine error: {0}")]
    SearchEngine(String),

    #[error("{service} error: {message}")]
    Collaborator { service: &'static str, message: String },

    #[error("Invalid object key: {0}")]
    InvalidObjectKey(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Search failed")]
    SearchFailed,

    #[error("Generic error: {0}")]
    Generic(String),
}

impl AppError {
    pub fn collaborator(service: &'static str, message: impl Into<String>) -> Self {
        AppError::Collaborator { service, message: message.into() }
    }
}

impl ResponseError for AppError {
    // Error bodies stay readable from any origin.
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
            .json(serde_json::json!({
                "error": self.to_string(),
            }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Elasticsearch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Tantivy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::IndexAlreadyExists(_) => StatusCode::CONFLICT,
            AppError::SearchEngine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Collaborator { .. } => StatusCode::BAD_GATEWAY,
            AppError::InvalidObjectKey(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::SearchFailed => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
