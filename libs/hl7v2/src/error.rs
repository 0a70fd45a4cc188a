//! Error types for HL7 v2 message handling

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// HL7 v2 message errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Invalid delimiter: {0}")]
    InvalidDelimiter(String),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Conversion failure: {0}")]
    ConversionFailure(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    pub(crate) fn index(index: usize, level: &str) -> Error {
        Error::InvalidIndex(format!("index {index} is not valid on a {level}"))
    }
}
