//! gdmirror Google Drive - Drive API v3 adapter
//!
//! Provides an async, read-only client for:
//! - Paged file listings driven by Drive query strings
//! - Single-file metadata lookups
//! - Streamed content downloads (`alt=media`)
//!
//! ## Modules
//!
//! - [`client`] - Drive v3 HTTP client with throttle handling
//! - [`provider`] - `IRemoteDrive` implementation on top of the client
//! - [`throttle`] - `Retry-After` and rate-limit response helpers

pub mod client;
pub mod provider;
pub mod throttle;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Access token missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token lacks the scope or permission for the request
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested file does not exist or is not visible
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit still exceeded after the configured retries
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the server asked to wait
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DriveError {
    /// Maps a non-success HTTP status and its body to an error
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => DriveError::Unauthorized(body),
            StatusCode::FORBIDDEN => DriveError::Forbidden(body),
            StatusCode::NOT_FOUND => DriveError::NotFound(body),
            StatusCode::TOO_MANY_REQUESTS => DriveError::TooManyRequests {
                retry_after: throttle::DEFAULT_RETRY_AFTER,
            },
            s if s.is_server_error() => DriveError::ServerError(format!("{s}: {body}")),
            s => DriveError::InvalidResponse(format!("unexpected status {s}: {body}")),
        }
    }

    /// Returns true for the "object does not exist" case
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriveError::NotFound(_))
    }
}
