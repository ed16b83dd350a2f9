//! Library error type.
//!
//! Only input and setup problems surface as `AppError`. Network failures inside
//! discovery adapters are converted to [`crate::discovery::AdapterOutcome`] and
//! never reach this type.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported file format '{0}' (expected .csv, .xlsx, .xlsm, .xls or .ods)")]
    UnsupportedFormat(String),

    #[error("Required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Domain extraction failed: {0}")]
    DomainExtraction(String),

    #[error("Insufficient input: {0}")]
    InsufficientInput(String),
}

impl AppError {
    pub(crate) fn io(path: impl Into<String>, source: io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by the input file rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AppError::UnsupportedFormat(_)
                | AppError::MissingColumn { .. }
                | AppError::Csv(_)
                | AppError::Spreadsheet(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
