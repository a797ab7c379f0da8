//! Error types shared by the catalog, query, transport and attribution layers.

use thiserror::Error;

use crate::measures::DataType;

/// Errors that can occur while building, running or attributing a cost report.
///
/// None of these are retried. Any of them aborts the report being computed.
#[derive(Error, Debug)]
pub enum CostReportError {
    /// A label or name is absent from the measure catalog.
    #[error("Measure with {field} '{value}' not found in catalog")]
    NotFound { field: &'static str, value: String },

    /// Two catalog entries share a label or a name.
    #[error("Duplicate measure {field} '{value}' in catalog")]
    DuplicateMeasure { field: &'static str, value: String },

    /// Filter operator outside the supported whitelist.
    #[error("Unsupported filter operator: {0}")]
    UnsupportedOperator(String),

    /// Measure data type this crate does not know how to convert.
    #[error("Unsupported measure type: {0}")]
    UnsupportedType(String),

    /// Upstream response does not have the documented shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A raw value could not be parsed into its declared type.
    #[error("Cannot convert '{value}' in column '{column}' to {expected}")]
    Conversion {
        column: String,
        value: String,
        expected: DataType,
    },

    /// A column alias mapping does not cover an output column.
    #[error("No alias defined for column '{0}'")]
    UnmappedColumn(String),

    /// A report lacks a column the caller needs.
    #[error("Report has no column '{0}'")]
    MissingColumn(String),

    /// A report column holds values of the wrong kind.
    #[error("Column '{column}' is not {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    /// Two reports disagree in a way the attribution cannot reconcile.
    #[error("Data integrity error: {0}")]
    Integrity(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Missing or unusable credentials.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Report file could not be uploaded.
    #[error("Upload error: {0}")]
    Upload(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local I/O error (token command, report files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T, E = CostReportError> = std::result::Result<T, E>;
