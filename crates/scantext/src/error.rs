//! Error types for scantext.
//!
//! All fallible operations in the pipeline return [`Result`]. The taxonomy
//! separates errors by what the caller can do about them:
//!
//! - `Validation`: bad input, reported immediately, never retried.
//! - `Configuration`: no API key held; terminal until reconfigured.
//! - `Auth`: the credential was rejected; the session key must be
//!   invalidated and reconfigured, never retried as-is.
//! - `Transient`: non-2xx, non-auth HTTP failure or transport error; safe
//!   to retry with backoff.
//! - `Recognition`: the service accepted the request but failed to process
//!   the document; reported, not retried.
//! - `Translation`: the translation service failed.
//! - `Storage`: local persistence I/O failed; surfaced, never swallowed.
//!
//! System `Io` errors always bubble up unchanged via `?`.

use thiserror::Error;

/// Result type alias using `PipelineError`.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for all pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("Transient service error: {message}")]
    Transient { message: String },

    #[error("Recognition error: {message}")]
    Recognition { message: String },

    #[error("Translation error: {message}")]
    Translation { message: String },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl PipelineError {
    /// Create a Validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a Transient error.
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Create a Recognition error.
    pub fn recognition<S: Into<String>>(message: S) -> Self {
        Self::Recognition {
            message: message.into(),
        }
    }

    /// Create a Translation error.
    pub fn translation<S: Into<String>>(message: S) -> Self {
        Self::Translation {
            message: message.into(),
        }
    }

    /// Create a Storage error.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Storage error with source.
    pub fn storage_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True for errors that abort the remainder of a batch (the credential
    /// is dead, or admission was denied upstream); everything else is
    /// isolated per item.
    pub fn aborts_batch(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Configuration(_))
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipelineError::transient(format!("request timed out: {}", err))
        } else {
            PipelineError::transient(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<String> {
            let content = std::fs::read_to_string("/nonexistent/file.txt")?;
            Ok(content)
        }

        let result = read_file();
        assert!(matches!(result.unwrap_err(), PipelineError::Io(_)));
    }

    #[test]
    fn test_validation_error_display() {
        let err = PipelineError::validation("file too large");
        assert_eq!(err.to_string(), "Validation error: file too large");
    }

    #[test]
    fn test_storage_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "cannot write");
        let err = PipelineError::storage_with_source("cache write failed", source);
        assert_eq!(err.to_string(), "Storage error: cache write failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_auth_aborts_batch() {
        assert!(PipelineError::Auth("invalid key".to_string()).aborts_batch());
        assert!(PipelineError::Configuration("no key".to_string()).aborts_batch());
        assert!(!PipelineError::validation("too large").aborts_batch());
        assert!(!PipelineError::recognition("blurry scan").aborts_batch());
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: PipelineError = json_err.into();
        assert!(matches!(err, PipelineError::Serialization(_)));
    }
}
