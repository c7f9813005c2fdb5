//! Error types for the heatmap services.

use thiserror::Error;

/// Result type alias using HeatmapError.
pub type HeatmapResult<T> = Result<T, HeatmapError>;

/// Primary error type for heatmap generation.
#[derive(Debug, Error)]
pub enum HeatmapError {
    // === Request Errors ===
    #[error("Coordinate list is not in the correct format: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Resource Errors ===
    #[error("Map not found: {0}")]
    MapNotFound(String),

    // === Rendering Errors ===
    #[error("Failed to decode image: {0}")]
    ImageError(String),

    #[error("PNG encoding failed: {0}")]
    EncodeError(String),

    // === Storage Errors ===
    #[error("Upload failed: {0}")]
    UploadError(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl HeatmapError {
    /// Shorthand for a parameter validation failure.
    pub fn invalid_parameter(param: &str, message: impl Into<String>) -> Self {
        HeatmapError::InvalidParameter {
            param: param.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error was caused by the request rather than the service.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            HeatmapError::InvalidCoordinates(_) | HeatmapError::InvalidParameter { .. }
        )
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            HeatmapError::InvalidCoordinates(_) | HeatmapError::InvalidParameter { .. } => 400,

            HeatmapError::MapNotFound(_) => 404,

            HeatmapError::UploadError(_) => 502,

            _ => 500,
        }
    }
}

impl From<std::io::Error> for HeatmapError {
    fn from(err: std::io::Error) -> Self {
        HeatmapError::IoError(err.to_string())
    }
}
