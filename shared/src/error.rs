//! Error types for the media request bridge.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the configuration and payload boundary.
///
/// The decision engine itself never fails; every core call ends in a
/// [`crate::ResponseEnvelope`]. These errors only cover loading configuration
/// and decoding caller payloads before the core runs.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::Serialization(_) => 400,
            Error::Config(_) => 500,
        }
    }
}
