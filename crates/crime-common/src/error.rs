//! Error types for the crime-grid services.

use thiserror::Error;

/// Result type alias using CrimeError.
pub type CrimeResult<T> = Result<T, CrimeError>;

/// Primary error type for pipeline and API operations.
#[derive(Debug, Error)]
pub enum CrimeError {
    // === Input/parameter errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid value for '{column}': {message}")]
    InvalidValue { column: String, message: String },

    // === Data errors ===
    #[error("Data not available for period: {0}")]
    DataNotAvailable(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(String),

    // === Storage errors ===
    #[error("Database error: {0}")]
    Database(String),

    // === Infrastructure errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrimeError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            CrimeError::MissingParameter(_)
            | CrimeError::InvalidParameter { .. }
            | CrimeError::MissingColumn(_)
            | CrimeError::InvalidValue { .. } => 400,

            CrimeError::DataNotAvailable(_) | CrimeError::FileNotFound(_) => 404,

            _ => 500,
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for CrimeError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            CrimeError::FileNotFound(err.to_string())
        } else {
            CrimeError::Internal(err.to_string())
        }
    }
}

impl From<csv::Error> for CrimeError {
    fn from(err: csv::Error) -> Self {
        CrimeError::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for CrimeError {
    fn from(err: serde_json::Error) -> Self {
        CrimeError::Internal(format!("JSON error: {}", err))
    }
}
