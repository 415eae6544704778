//! Domain error types
//!
//! Errors raised while constructing or validating domain values:
//! identifiers, local file names, timestamps and credentials.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote object identifier
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// A remote name that cannot be used as a local path component
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// A remote timestamp that could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A remote size field that is not a non-negative integer
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
