use crate::proxy::ProxyError;
use crate::registry::RegistryError;
use crate::storage::base::StorageError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Extraction error: {0}")]
    ExtractionError(String),

    #[error("Retry wait of {0:?} exceeds the configured maximum")]
    RetryTimeout(Duration),

    #[error("Malformed Retry-After header: {0}")]
    MalformedRetryAfter(String),

    #[error("Proxy error: {0}")]
    ProxyError(#[from] ProxyError),

    #[error("Registry error: {0}")]
    RegistryError(#[from] RegistryError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl ScraperError {
    /// Stable name recorded in the failure log for broken crawl tasks.
    pub fn kind(&self) -> &'static str {
        match self {
            ScraperError::HttpError(_) => "HttpError",
            ScraperError::UrlError(_) => "UrlError",
            ScraperError::IoError(_) => "IoError",
            ScraperError::JsonError(_) => "JsonError",
            ScraperError::ExtractionError(_) => "ExtractionError",
            ScraperError::RetryTimeout(_) => "RetryTimeout",
            ScraperError::MalformedRetryAfter(_) => "MalformedRetryAfter",
            ScraperError::ProxyError(_) => "ProxyError",
            ScraperError::RegistryError(_) => "RegistryError",
            ScraperError::StorageError(_) => "StorageError",
        }
    }
}

pub type ScraperResult<T> = Result<T, ScraperError>;
