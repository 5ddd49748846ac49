//! Error types for dashboard operations

use std::time::Duration;
use thiserror::Error;

/// Dashboard specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// Identifier is neither a 6-digit code nor a listed company name
    #[error("'{0}' was not found in the listing. Try entering the 6-digit stock code directly.")]
    SymbolNotFound(String),

    /// A company name could not be looked up because the listing failed to load
    #[error(
        "Could not look up '{identifier}': company listing unavailable ({reason}). Try entering the 6-digit stock code directly."
    )]
    ListingUnavailable {
        identifier: String,
        reason: String,
    },

    /// Nothing was entered
    #[error("Enter a company name or a 6-digit stock code")]
    EmptyQuery,

    /// Provider answered but had no rows for the request
    #[error("No data: {0}")]
    EmptyResult(String),

    /// A view was requested before any successful query
    #[error("No company loaded yet. Run a query first.")]
    NoActiveQuery,

    /// API request failed
    #[error("{provider} error: {reason}")]
    Api {
        provider: &'static str,
        reason: String,
    },

    /// Provider call exceeded the configured timeout
    #[error("{provider} did not respond within {after:?}")]
    Timeout {
        provider: &'static str,
        after: Duration,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// XML payload could not be decoded
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::DeError),

    /// Archive payload could not be read
    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Workbook could not be written
    #[error("Spreadsheet error: {0}")]
    XlsxWriteError(#[from] rust_xlsxwriter::XlsxError),

    /// Workbook could not be read
    #[error("Spreadsheet error: {0}")]
    XlsxReadError(#[from] calamine::XlsxError),

    /// File system error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Start/end dates that cannot form a range
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    /// Price rows that violate the series invariants
    #[error("Invalid price series: {0}")]
    InvalidSeries(String),

    /// Indicator could not be set up
    #[error("Indicator error: {0}")]
    IndicatorError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Coarse classification used at the request boundary to pick a message style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// User input could not be turned into a security code; re-prompt
    Resolution,
    /// A provider failed; show a warning and keep the previous session
    Fetch,
    /// Valid request with zero rows; informational
    EmptyResult,
    /// No session snapshot to work on
    Session,
    /// Malformed input or configuration
    Invalid,
}

impl StockError {
    /// Shorthand for provider failures
    pub fn api(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::Api {
            provider,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SymbolNotFound(_) | Self::EmptyQuery => ErrorKind::Resolution,
            Self::EmptyResult(_) => ErrorKind::EmptyResult,
            Self::NoActiveQuery => ErrorKind::Session,
            Self::InvalidDateRange(_)
            | Self::InvalidSeries(_)
            | Self::IndicatorError(_)
            | Self::ConfigError(_) => ErrorKind::Invalid,
            Self::ListingUnavailable { .. }
            | Self::Api { .. }
            | Self::Timeout { .. }
            | Self::NetworkError(_)
            | Self::JsonError(_)
            | Self::XmlError(_)
            | Self::ArchiveError(_)
            | Self::CsvError(_)
            | Self::XlsxWriteError(_)
            | Self::XlsxReadError(_)
            | Self::IoError(_)
            | Self::Other(_) => ErrorKind::Fetch,
        }
    }

    /// Soft errors are reported as information rather than failures
    pub fn is_soft(&self) -> bool {
        matches!(self.kind(), ErrorKind::EmptyResult | ErrorKind::Session)
    }
}

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, StockError>;

/// Convert anyhow::Error to StockError
impl From<anyhow::Error> for StockError {
    fn from(err: anyhow::Error) -> Self {
        StockError::Other(format!("{err:#}"))
    }
}
