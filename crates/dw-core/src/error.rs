//! Error types for dw-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dw-core
#[derive(Debug, Error)]
pub enum Error {
    /// File extension is not one of the supported dataset formats
    #[error("unsupported dataset format for '{path}' (expected .csv or .xlsx)")]
    UnsupportedFormat { path: PathBuf },

    /// Dataset file does not exist
    #[error("dataset not found at '{path}'")]
    NotFound { path: PathBuf },

    /// Update target row is absent
    #[error("no record found where '{column}' is '{value}'")]
    RecordNotFound { column: String, value: String },

    /// Requested column does not exist in the table
    #[error("column '{column}' does not exist")]
    UnknownColumn { column: String },

    /// Requested row index is past the end of the table
    #[error("row index {index} out of range for table with {rows} rows")]
    RowOutOfRange { index: usize, rows: usize },

    /// A requested column pair produced no numeric data to plot
    #[error("columns '{x}' and '{y}' have no plottable values")]
    NoPlottableData { x: String, y: String },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed tabular content (e.g. missing header row)
    #[error("failed to parse '{path}': {message}")]
    Malformed { path: PathBuf, message: String },

    /// CSV decode error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Spreadsheet decode error
    #[error("spreadsheet error in '{path}': {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    /// Spreadsheet encode error
    #[error("failed to write spreadsheet '{path}': {source}")]
    SpreadsheetWrite {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// Directory traversal error
    #[error("failed to traverse data directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
