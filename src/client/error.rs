//! Analysis service error types

use thiserror::Error;

/// Errors that can occur talking to the decomposition service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Network(_) => true,
            ServiceError::Api { status, .. } => *status >= 500,
            ServiceError::InvalidResponse(_) => false,
            ServiceError::Json(_) => false,
        }
    }
}
