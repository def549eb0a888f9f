//! Error types for the commit log
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for commit log operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    /// The requested index entry or store position does not exist yet,
    /// or the index has no room for another entry.
    #[error("End of data")]
    EndOfData,

    #[error("Offset not found: {0}")]
    OffsetNotFound(u64),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Cleanup Errors
    // -------------------------------------------------------------------------
    /// Several segments failed during close/remove; every step was still attempted.
    #[error("{} errors: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<LogError>),
}

impl LogError {
    /// True for the end-of-data condition (empty index, entry past the end,
    /// full index, or a store read past end of file)
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, LogError::EndOfData)
    }

    /// Fold the errors collected during a multi-step cleanup into one outcome.
    pub(crate) fn collect(mut errors: Vec<LogError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(LogError::Multiple(errors)),
        }
    }
}

fn join_errors(errors: &[LogError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
