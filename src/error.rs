//! Error types for the rememe library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rememe operations
pub type Result<T> = std::result::Result<T, SubstitutionError>;

/// Every way a substitution, validation or search can fail.
#[derive(Error, Debug)]
pub enum SubstitutionError {
    /// A caller-supplied parameter is outside its legal domain
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Validation was requested while the engine holds no attempt
    #[error("No substitution has been performed yet")]
    NoAttempt,

    /// The region locator produced no position, so the paste would be ambiguous
    #[error("No placement position was found in the template")]
    PlacementNotFound,

    /// Image file does not exist
    #[error("Image not found: {}", .path.display())]
    ImageNotFound { path: PathBuf },

    /// Image file exists but could not be decoded
    #[error("Failed to decode image {}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Composited image could not be written
    #[error("Failed to save image {}", .path.display())]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A batch worker died before reporting a result
    #[error("Worker for {} failed: {message}", .template.display())]
    WorkerFailed { template: PathBuf, message: String },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SubstitutionError {
    /// Create an invalid parameter error from any displayable value
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether a retry search may move on to the next candidate after this error.
    ///
    /// Only a missing placement is a per-candidate outcome; parameter and state
    /// errors are surfaced to the caller immediately.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SubstitutionError::PlacementNotFound)
    }
}
