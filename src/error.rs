use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("Failed to extract metadata: {0}")]
    ExtractError(String),

    #[error("Content too large: {size} bytes exceeds limit of {limit} bytes")]
    ContentTooLarge { size: usize, limit: usize },

    #[error("Request timeout: {0}")]
    TimeoutError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to render HTML: {0}")]
    RenderError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Custom field store error: {0}")]
    StoreError(String),

    #[error("External service error: {service} - {message}")]
    ExternalServiceError { service: String, message: String },
}

impl PreviewError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PreviewError::TimeoutError(e.to_string())
        } else if e.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            PreviewError::NotFound(e.to_string())
        } else {
            PreviewError::FetchError(e.to_string())
        }
    }

    pub fn log(&self) {
        match self {
            PreviewError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            PreviewError::FetchError(e) => {
                warn!(error = %e, "Content fetch failed");
            }
            PreviewError::ExtractError(e) => {
                warn!(error = %e, "Metadata extraction failed");
            }
            PreviewError::ContentTooLarge { size, limit } => {
                warn!(size = size, limit = limit, "Download exceeded size limit");
            }
            PreviewError::TimeoutError(e) => {
                warn!(error = %e, "Request timed out");
            }
            PreviewError::NotFound(e) => {
                warn!(error = %e, "Resource not found");
            }
            PreviewError::RenderError(e) => {
                error!(error = %e, "HTML rendering failed");
            }
            PreviewError::ConfigError(e) => {
                error!(error = %e, "Configuration could not be loaded");
            }
            PreviewError::StoreError(e) => {
                error!(error = %e, "Custom field store operation failed");
            }
            PreviewError::ExternalServiceError { service, message } => {
                error!(
                    service = %service,
                    error = %message,
                    "External service error occurred"
                );
            }
        }
    }
}
