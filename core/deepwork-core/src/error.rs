//! Error types for deepwork-core operations.
//!
//! Absent documents are never errors: reads resolve them to typed defaults.
//! Everything that can fail on a mutation path surfaces here instead.

use std::path::PathBuf;

use crate::store::DocKey;

/// All errors that can occur in deepwork-core operations.
#[derive(Debug, thiserror::Error)]
pub enum DeepWorkError {
    // ─────────────────────────────────────────────────────────────────────
    // Persistence Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Integrity check failed for {doc}: {details}")]
    Integrity { doc: DocKey, details: String },

    #[error("Write failed: {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Data directory unusable: {path}: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Input Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Activity not found: {0}")]
    ActivityNotFound(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    // ─────────────────────────────────────────────────────────────────────
    // I/O and Parsing Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },
}

/// Convenience type alias for Results using DeepWorkError.
pub type Result<T> = std::result::Result<T, DeepWorkError>;

// Conversion for string error compatibility
impl From<DeepWorkError> for String {
    fn from(err: DeepWorkError) -> String {
        err.to_string()
    }
}
