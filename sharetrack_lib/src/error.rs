//! Error types for the library layer.

use std::fmt;

use crate::csv_io::CsvError;
use crate::store::StoreError;

/// Errors produced by the library layer, wrapping record-store failures
/// and adding input validation and authorization failures.
#[derive(Debug)]
pub enum SharetrackError {
    /// An error from the underlying record store.
    Store(StoreError),
    /// JSON serialization or deserialization failed.
    Serialization(serde_json::Error),
    /// Reading or writing delimited text failed.
    Csv(CsvError),
    /// A file could not be read or written.
    Io(std::io::Error),
    /// User-provided input failed validation.
    InvalidInput(String),
    /// The session is not allowed to perform the operation.
    Forbidden(String),
    /// A record referenced by id does not exist.
    NotFound(String),
}

impl fmt::Display for SharetrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "Store error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Csv(e) => write!(f, "CSV error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for SharetrackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for SharetrackError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<serde_json::Error> for SharetrackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<CsvError> for SharetrackError {
    fn from(e: CsvError) -> Self {
        Self::Csv(e)
    }
}

impl From<std::io::Error> for SharetrackError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
