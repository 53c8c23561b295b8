//! Error types for Wicket

use hyper::StatusCode;

/// Main error type for Wicket operations
#[derive(Debug, thiserror::Error)]
pub enum WicketError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WicketError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyCompleted(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Delivery(_) => StatusCode::BAD_GATEWAY,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for WicketError {
    fn from(err: std::io::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for WicketError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for WicketError {
    fn from(err: hyper::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<mongodb::error::Error> for WicketError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for WicketError {
    fn from(err: reqwest::Error) -> Self {
        Self::Delivery(err.to_string())
    }
}

/// Result type alias for Wicket operations
pub type Result<T> = std::result::Result<T, WicketError>;
