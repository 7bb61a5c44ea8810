//! Custom error types for the preprocessing engine.
//!
//! This module provides the error hierarchy using `thiserror`. Every error the
//! engine raises is a deterministic function of its input, so none of them are
//! retried; a failed transform produces no output.
//!
//! Errors are serializable as `{code, message}` so the CLI can emit them as JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the preprocessing engine.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// Input file format is not one the extraction step can read.
    #[error("Unsupported input format: {0}")]
    UnsupportedInput(String),

    /// A numeric column has no values to compute a mean from.
    #[error("Numeric column '{0}' has no non-missing values to impute from")]
    DegenerateColumn(String),

    /// The numeric and categorical stages disagree on row count.
    #[error(
        "Row count mismatch between stages: numeric has {numeric} rows, \
         categorical has {categorical}"
    )]
    RowCountMismatch { numeric: usize, categorical: usize },

    /// A categorical value could not be turned into text for vocabulary lookup.
    #[error("Failed to encode column '{column}': {reason}")]
    Encoding { column: String, reason: String },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Type conversion failed.
    #[error("Failed to read column '{column}' as numeric: {reason}")]
    TypeConversionFailed { column: String, reason: String },

    /// Two output features ended up with the same generated name.
    #[error("Duplicate feature name '{0}' in assembled output")]
    DuplicateFeatureName(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PreprocessingError>,
    },
}

impl PreprocessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PreprocessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedInput(_) => "UNSUPPORTED_INPUT",
            Self::DegenerateColumn(_) => "DEGENERATE_COLUMN",
            Self::RowCountMismatch { .. } => "ROW_COUNT_MISMATCH",
            Self::Encoding { .. } => "ENCODING_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::DuplicateFeatureName(_) => "DUPLICATE_FEATURE_NAME",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was caused by the content of the input table.
    ///
    /// Such errors reproduce on every run with the same data.
    pub fn is_data_quality(&self) -> bool {
        match self {
            Self::DegenerateColumn(_)
            | Self::Encoding { .. }
            | Self::ColumnNotFound(_)
            | Self::TypeConversionFailed { .. }
            | Self::DuplicateFeatureName(_) => true,
            Self::WithContext { source, .. } => source.is_data_quality(),
            _ => false,
        }
    }

    /// Check if this error signals a broken internal invariant.
    pub fn is_defect(&self) -> bool {
        match self {
            Self::RowCountMismatch { .. } => true,
            Self::WithContext { source, .. } => source.is_defect(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PreprocessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PreprocessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PreprocessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PreprocessingError::DegenerateColumn("age".to_string()).error_code(),
            "DEGENERATE_COLUMN"
        );
        assert_eq!(
            PreprocessingError::RowCountMismatch {
                numeric: 3,
                categorical: 2
            }
            .error_code(),
            "ROW_COUNT_MISMATCH"
        );
    }

    #[test]
    fn test_is_data_quality() {
        assert!(PreprocessingError::DegenerateColumn("age".to_string()).is_data_quality());
        assert!(!PreprocessingError::UnsupportedInput("x.xlsx".to_string()).is_data_quality());
        assert!(
            !PreprocessingError::RowCountMismatch {
                numeric: 1,
                categorical: 2
            }
            .is_data_quality()
        );
    }

    #[test]
    fn test_is_defect() {
        let error = PreprocessingError::RowCountMismatch {
            numeric: 1,
            categorical: 2,
        }
        .with_context("During assembly");
        assert!(error.is_defect());
        assert!(!PreprocessingError::DegenerateColumn("a".to_string()).is_defect());
    }

    #[test]
    fn test_error_serialization() {
        let error = PreprocessingError::ColumnNotFound("salary".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("salary"));
    }

    #[test]
    fn test_with_context() {
        let error = PreprocessingError::DegenerateColumn("age".to_string())
            .with_context("During numeric fit");
        assert!(error.to_string().contains("During numeric fit"));
        assert_eq!(error.error_code(), "DEGENERATE_COLUMN"); // Preserves original code
        assert!(error.is_data_quality());
    }
}
