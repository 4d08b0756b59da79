//! Error types for the listings pipeline

use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, EdaError>;

/// Pipeline stage, used to tag fatal errors and stage reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Project,
    NormalizePrice,
    DropMissingSuperhost,
    DropMissingRating,
    CanonicalizeResponseTime,
    CohortFilter,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Project => "project",
            Stage::NormalizePrice => "normalize_price",
            Stage::DropMissingSuperhost => "drop_missing_superhost",
            Stage::DropMissingRating => "drop_missing_rating",
            Stage::CanonicalizeResponseTime => "canonicalize_response_time",
            Stage::CohortFilter => "cohort_filter",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum EdaError {
    #[error("Source unavailable: {locator}: {reason}")]
    SourceUnavailable { locator: String, reason: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Row-level; the price normalizer recovers from it by dropping the row.
    #[error("Cannot parse price {raw:?} at row {row}")]
    PriceParseError { row: usize, raw: String },

    #[error("Write error: {path}: {reason}")]
    WriteError { path: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Stage {stage} failed with {rows} rows in hand: {source}")]
    Stage {
        stage: Stage,
        rows: usize,
        #[source]
        source: Box<EdaError>,
    },
}

impl EdaError {
    /// Attach stage name and row count to a fatal error
    pub fn in_stage(self, stage: Stage, rows: usize) -> Self {
        match self {
            already @ EdaError::Stage { .. } => already,
            other => EdaError::Stage {
                stage,
                rows,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping stage wrappers
    pub fn root(&self) -> &EdaError {
        match self {
            EdaError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<polars::error::PolarsError> for EdaError {
    fn from(err: polars::error::PolarsError) -> Self {
        EdaError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for EdaError {
    fn from(err: serde_json::Error) -> Self {
        EdaError::ConfigError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for EdaError {
    fn from(err: ndarray::ShapeError) -> Self {
        EdaError::ModelError(format!("invalid design matrix shape: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EdaError::MissingColumn("price".to_string());
        assert_eq!(err.to_string(), "Missing column: price");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EdaError = io_err.into();
        assert!(matches!(err, EdaError::IoError(_)));
    }

    #[test]
    fn test_in_stage_keeps_innermost_context() {
        let err = EdaError::MissingColumn("host_id".into())
            .in_stage(Stage::CohortFilter, 42)
            .in_stage(Stage::Persist, 0);

        match &err {
            EdaError::Stage { stage, rows, .. } => {
                assert_eq!(*stage, Stage::CohortFilter);
                assert_eq!(*rows, 42);
            }
            other => panic!("expected stage wrapper, got {other:?}"),
        }
        assert!(matches!(err.root(), EdaError::MissingColumn(name) if name == "host_id"));
        assert!(err.to_string().contains("cohort_filter"));
    }
}
