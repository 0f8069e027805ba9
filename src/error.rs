//! Error types for the sheet-dispatch library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the pipeline.

use thiserror::Error;

/// Errors that can occur while splitting, matching, sending or exporting.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet could not be opened or parsed
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Spreadsheet could not be written
    #[error("Spreadsheet write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSV input could not be parsed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Output archive could not be built
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Run report could not be serialized
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// An input file was not supplied or does not exist
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// A supplied input file exists but could not be read as a table
    #[error("Error loading {label} file {path}: {reason}")]
    UnreadableInput {
        /// Which input ("Input" or "Distribution list")
        label: String,
        /// Path as given
        path: String,
        /// Underlying loader error
        reason: String,
    },

    /// The operator did not pick any grouping column
    #[error("No grouping column selected")]
    NoColumnsSelected,

    /// The operator picked a grouping column outside the allowed options
    #[error("Grouping column not allowed: {column}. Allowed: {allowed:?}")]
    ColumnNotAllowed {
        /// Requested column
        column: String,
        /// Configured options
        allowed: Vec<String>,
    },

    /// A table lacks columns the pipeline needs
    #[error("{table} is missing required column(s): {columns:?}")]
    MissingColumns {
        /// Which input table
        table: String,
        /// Absent column names
        columns: Vec<String>,
    },

    /// The workbook has no worksheet or no header row
    #[error("Workbook has no data: {0}")]
    EmptyWorkbook(String),

    /// The mail transport could not be reached; the run must stop
    #[error("Unable to start mail client: {0}")]
    MailClientUnavailable(String),

    /// A single message could not be built or delivered
    #[error("Mail error: {0}")]
    Mail(String),

    /// A recipient or sender address is malformed
    #[error("Invalid email address '{address}': {reason}")]
    InvalidAddress {
        /// Offending address
        address: String,
        /// Why it was rejected
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DispatchError {
    /// Operator-input problems that should be shown as a warning rather than a failure.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::MissingInput(_)
                | Self::UnreadableInput { .. }
                | Self::NoColumnsSelected
                | Self::ColumnNotAllowed { .. }
        )
    }
}

/// Convenience type alias for Result with `DispatchError`
pub type Result<T> = std::result::Result<T, DispatchError>;

impl From<lettre::error::Error> for DispatchError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Mail(err.to_string())
    }
}

impl From<lettre::address::AddressError> for DispatchError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::Mail(err.to_string())
    }
}
