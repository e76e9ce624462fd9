//! Error types for the casedash library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for casedash operations.
///
/// The engines themselves recover from malformed schema data locally; these
/// errors come from loading inputs and from the external data source.
#[derive(Debug, Error)]
pub enum DashError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing delimited case data.
    #[error("Parse error at row {row}, column {column}: {message}")]
    Parse {
        row: usize,
        column: usize,
        message: String,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no data to load.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error, including filter values of the wrong kind.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A schema document that cannot be used at all.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Failure reported by the remote data source or a reference-data loader.
    #[error("Data source error: {0}")]
    DataSource(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for casedash operations.
pub type Result<T> = std::result::Result<T, DashError>;

/// Why an epi curve cannot be rendered.
///
/// Returned as a value so the UI can show an unavailable-widget state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurveUnavailable {
    /// None of the candidate columns is a time column.
    #[error("no time column is available for this case type")]
    NoTimeColumn,

    /// The requested column is not bound to a time column type.
    #[error("case type column '{0}' is not a time column")]
    NotATimeColumn(String),
}
