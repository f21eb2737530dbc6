//! Export error types.

use station_common::{ExplorerError, SessionId};
use thiserror::Error;

/// Reasons an export stops.
///
/// A remote failure and a sink failure are distinct variants so callers can
/// tell "the data source broke" from "we could not write the output".
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid year range: {begin}..{end}")]
    InvalidRange { begin: i32, end: i32 },

    #[error("Remote query failed for year {year}: {message}")]
    RemoteQuery { year: i32, message: String },

    #[error("Sink write failed{}: {message}", year_suffix(.year))]
    SinkWrite { year: Option<i32>, message: String },

    #[error("Export already running for session {0}")]
    AlreadyRunning(SessionId),
}

fn year_suffix(year: &Option<i32>) -> String {
    match year {
        Some(year) => format!(" for year {}", year),
        None => String::new(),
    }
}

impl ExportError {
    /// Stable tag stored in the failed export status.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::InvalidRange { .. } => "invalid_range",
            ExportError::RemoteQuery { .. } => "remote_query",
            ExportError::SinkWrite { .. } => "sink_write",
            ExportError::AlreadyRunning(_) => "already_running",
        }
    }

    /// The year being exported when the error happened, if any.
    pub fn year(&self) -> Option<i32> {
        match self {
            ExportError::RemoteQuery { year, .. } => Some(*year),
            ExportError::SinkWrite { year, .. } => *year,
            _ => None,
        }
    }

    pub(crate) fn remote(year: i32, message: impl Into<String>) -> Self {
        ExportError::RemoteQuery {
            year,
            message: message.into(),
        }
    }

    pub(crate) fn sink(year: Option<i32>, err: impl std::fmt::Display) -> Self {
        ExportError::SinkWrite {
            year,
            message: err.to_string(),
        }
    }
}

impl From<ExportError> for ExplorerError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::InvalidRange { begin, end } => ExplorerError::InvalidRange { begin, end },
            ExportError::AlreadyRunning(session) => ExplorerError::ExportInProgress(session.to_string()),
            other => ExplorerError::InternalError(other.to_string()),
        }
    }
}
