//! Error types for the station explorer services.

use thiserror::Error;

/// Result type alias using ExplorerError.
pub type ExplorerResult<T> = Result<T, ExplorerError>;

/// Primary error type for catalog, configuration and service operations.
#[derive(Debug, Error)]
pub enum ExplorerError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid session id: {0}")]
    InvalidSession(String),

    #[error("Unknown trigger: {0}")]
    UnknownTrigger(String),

    #[error("Invalid year range: {begin}..{end}")]
    InvalidRange { begin: i32, end: i32 },

    #[error("Export already running for session {0}")]
    ExportInProgress(String),

    // === Catalog Errors ===
    #[error("Failed to read catalog: {0}")]
    CatalogRead(String),

    #[error("Malformed inventory line {line}: {message}")]
    CatalogParse { line: usize, message: String },

    // === Infrastructure Errors ===
    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ExplorerError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ExplorerError::MissingParameter(_)
            | ExplorerError::InvalidParameter { .. }
            | ExplorerError::InvalidSession(_)
            | ExplorerError::InvalidRange { .. } => 400,

            ExplorerError::UnknownTrigger(_) => 404,

            ExplorerError::ExportInProgress(_) => 409,

            _ => 500,
        }
    }
}

impl From<std::io::Error> for ExplorerError {
    fn from(err: std::io::Error) -> Self {
        ExplorerError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for ExplorerError {
    fn from(err: serde_json::Error) -> Self {
        ExplorerError::InternalError(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ExplorerError::InvalidRange { begin: 2010, end: 2000 }.http_status_code(), 400);
        assert_eq!(ExplorerError::UnknownTrigger("x".into()).http_status_code(), 404);
        assert_eq!(ExplorerError::ExportInProgress("s".into()).http_status_code(), 409);
        assert_eq!(ExplorerError::CacheError("down".into()).http_status_code(), 500);
    }
}
