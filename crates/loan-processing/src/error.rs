//! Error types for the loan cleaning pipeline.
//!
//! Every failure of the pipeline surfaces as a [`CleaningError`]. The two
//! data-level families are schema violations (a column is absent or carries
//! no usable values) and parse failures (a raw value cannot be coerced).
//!
//! Errors serialize as `{ "code", "message" }` so a caller can hand them to a
//! report or another process unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// A column required by a stage is absent, or has no values to work with.
    #[error("Schema error in stage '{stage}': column '{column}' {reason}")]
    Schema {
        stage: String,
        column: String,
        reason: String,
    },

    /// A raw value could not be coerced to the type a stage expects.
    ///
    /// `row` is the row's position in the raw input, before any filtering.
    #[error("Failed to parse column '{column}' at row {row}: '{value}' is not {expected}")]
    Parse {
        column: String,
        row: usize,
        value: String,
        expected: String,
    },

    /// Two quantile edges of a slab feature are identical.
    #[error("Quantile edges collide for slab feature '{column}' at value {edge}")]
    SlabEdgeCollision { column: String, edge: f64 },

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
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Build a schema error for `column` raised by `stage`.
    pub fn schema(
        stage: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Schema {
            stage: stage.into(),
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Build a parse error for the raw value found at `row` of `column`.
    pub fn parse(
        column: impl Into<String>,
        row: usize,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::Parse {
            column: column.into(),
            row,
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::SlabEdgeCollision { .. } => "SLAB_EDGE_COLLISION",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Strip any context layers and return the underlying error.
    pub fn root(&self) -> &CleaningError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error is a schema violation.
    pub fn is_schema_error(&self) -> bool {
        matches!(self.root(), Self::Schema { .. })
    }

    /// Check if this error was caused by a value in the input data.
    ///
    /// Data errors will not go away on a rerun; the input has to be fixed.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self.root(),
            Self::Parse { .. } | Self::SlabEdgeCollision { .. }
        )
    }
}

impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

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
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            CleaningError::schema("filter", "loan_status", "is missing").error_code(),
            "SCHEMA_ERROR"
        );
        assert_eq!(
            CleaningError::parse("int_rate", 4, "abc%", "a percentage").error_code(),
            "PARSE_ERROR"
        );
    }

    #[test]
    fn test_parse_error_message_names_column_row_and_value() {
        let error = CleaningError::parse("int_rate", 17, "twelve%", "a percentage");
        let message = error.to_string();
        assert!(message.contains("int_rate"));
        assert!(message.contains("17"));
        assert!(message.contains("twelve%"));
    }

    #[test]
    fn test_error_classification() {
        assert!(CleaningError::schema("s", "c", "r").is_schema_error());
        assert!(!CleaningError::schema("s", "c", "r").is_data_error());
        assert!(CleaningError::parse("c", 0, "v", "e").is_data_error());
        assert!(
            CleaningError::SlabEdgeCollision {
                column: "open_acc".to_string(),
                edge: 3.0
            }
            .is_data_error()
        );
        assert!(!CleaningError::InvalidConfig("x".to_string()).is_data_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = CleaningError::schema("impute", "revol_util", "has no values");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("SCHEMA_ERROR"));
        assert!(json.contains("revol_util"));
    }

    #[test]
    fn test_with_context() {
        let error = CleaningError::parse("emp_length", 3, "n/a", "a tenure")
            .with_context("While approximating employment length");
        assert!(error.to_string().contains("While approximating"));
        assert_eq!(error.error_code(), "PARSE_ERROR"); // Preserves original code
        assert!(error.is_data_error());
    }
}
