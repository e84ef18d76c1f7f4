//! Custom error types for pubdash.
//!
//! Data-quality problems inside the pipeline never surface as errors; they degrade
//! to empty or neutral values. The variants below cover the boundaries only:
//! obtaining the CSV, decoding it, and talking to collaborators.

use thiserror::Error;

/// Main error type for pubdash operations.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The publication source could not be fetched or yielded no usable rows
    #[error("Load error: {0}")]
    Load(String),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote source answered with a non-success status
    #[error("HTTP {code} while fetching {location}")]
    Http {
        /// Status code returned by the server
        code: u16,
        /// Requested location
        location: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// A record failed validation
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `DashboardError`
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a validation error message
    fn ok_or_invalid(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| DashboardError::Validation(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_or_invalid() {
        let missing: Option<u8> = None;
        let err = missing.ok_or_invalid("usage type").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: usage type");
        assert_eq!(Some(3).ok_or_invalid("x").unwrap(), 3);
    }
}
