//! Error types for Prever operations.
//!
//! Provides rich error context for library consumers. The taxonomy splits
//! fatal conditions (schema or artifact problems, which abort training or
//! service start) from per-request conditions (a single rejected record or
//! aggregation query).

use std::fmt;

/// Main error type for Prever operations.
///
/// # Examples
///
/// ```
/// use prever::error::PreverError;
///
/// let err = PreverError::UnknownCategory {
///     feature: "MTRANS".to_string(),
///     value: "Scooter".to_string(),
/// };
/// assert!(err.to_string().contains("Scooter"));
/// ```
#[derive(Debug)]
pub enum PreverError {
    /// Dataset columns disagree with the feature schema. Fatal: aborts
    /// training or artifact load.
    SchemaMismatch {
        /// What the schema requires
        expected: String,
        /// What the dataset provided
        actual: String,
    },

    /// A categorical value was never seen during encoder fitting.
    /// Recoverable: rejects only the offending record.
    UnknownCategory {
        /// Feature the value belongs to
        feature: String,
        /// The out-of-vocabulary label
        value: String,
    },

    /// A single inference request is malformed (missing field, unparsable
    /// number). Recoverable: rejects only that request.
    InvalidInput {
        /// What was wrong with the record
        message: String,
    },

    /// The persisted model/encoder pair is inconsistent or incomplete.
    /// Fatal at service start; there is no fallback model.
    ArtifactMismatch {
        /// Why the pair cannot be trusted
        message: String,
    },

    /// The raw dataset cannot be loaded for an aggregation query.
    /// Recoverable per query.
    DataUnavailable {
        /// Path that was attempted
        path: String,
        /// Underlying cause
        message: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Serialization/deserialization error.
    Serialization(String),

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for PreverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreverError::SchemaMismatch { expected, actual } => {
                write!(f, "Schema mismatch: expected {expected}, got {actual}")
            }
            PreverError::UnknownCategory { feature, value } => {
                write!(
                    f,
                    "Unknown category for feature '{feature}': '{value}' was not seen during training"
                )
            }
            PreverError::InvalidInput { message } => {
                write!(f, "Invalid input: {message}")
            }
            PreverError::ArtifactMismatch { message } => {
                write!(f, "Artifact mismatch: {message}")
            }
            PreverError::DataUnavailable { path, message } => {
                write!(f, "Data unavailable at '{path}': {message}")
            }
            PreverError::Io(e) => write!(f, "I/O error: {e}"),
            PreverError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            PreverError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PreverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PreverError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PreverError {
    fn from(err: std::io::Error) -> Self {
        PreverError::Io(err)
    }
}

impl From<&str> for PreverError {
    fn from(msg: &str) -> Self {
        PreverError::Other(msg.to_string())
    }
}

impl From<String> for PreverError {
    fn from(msg: String) -> Self {
        PreverError::Other(msg)
    }
}

impl PreverError {
    /// Create a schema mismatch for a missing dataset column.
    #[must_use]
    pub fn missing_column(name: &str) -> Self {
        Self::SchemaMismatch {
            expected: format!("column '{name}'"),
            actual: "column absent from dataset".to_string(),
        }
    }

    /// Create an invalid-input error for a missing record field.
    #[must_use]
    pub fn missing_field(name: &str) -> Self {
        Self::InvalidInput {
            message: format!("required field '{name}' is missing"),
        }
    }

    /// True for conditions that reject a single request rather than the
    /// whole process.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PreverError::UnknownCategory { .. }
                | PreverError::InvalidInput { .. }
                | PreverError::DataUnavailable { .. }
        )
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, PreverError>;
