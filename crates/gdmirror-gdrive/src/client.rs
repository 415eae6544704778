//! Google Drive v3 API client
//!
//! Provides a typed HTTP client for the handful of Drive endpoints the mirror
//! needs. Handles the bearer header, query construction, JSON
//! deserialization and throttle retries.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gdmirror_gdrive::client::DriveClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("ya29.access-token");
//! let page = client
//!     .list_files("mimeType = 'application/vnd.google-apps.folder' and trashed = false", 100, None)
//!     .await?;
//! println!("{} folders on the first page", page.files.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use gdmirror_core::domain::newtypes::RemoteId;
use reqwest::{header::RETRY_AFTER, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::throttle::{is_rate_limit_reason, parse_retry_after, DEFAULT_RETRY_AFTER};
use crate::DriveError;

/// Base URL for Google Drive API v3
const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Partial-response selector for listings
pub const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,size,modifiedTime,parents)";

/// Partial-response selector for single-file metadata
pub const METADATA_FIELDS: &str = "id,name,mimeType,size,modifiedTime,parents";

/// Throttle retries before a 429 is surfaced as an error
const DEFAULT_MAX_THROTTLE_RETRIES: u32 = 5;

// ============================================================================
// Drive API response types
// ============================================================================

/// A file resource as returned by `files.list` and `files.get`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Byte size, encoded by the API as a decimal string
    pub size: Option<String>,
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parents: Vec<String>,
}

/// Response from `GET /files`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive API calls
///
/// Wraps `reqwest::Client` with the bearer header and base URL of the
/// Drive v3 API. Throttle responses (429, or 403 with a rate-limit reason)
/// are retried after the server-provided delay.
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// OAuth2 access token with a Drive read scope
    access_token: String,
    /// Throttle retries before giving up
    max_throttle_retries: u32,
    /// Delay used when a throttle response has no `Retry-After`
    default_retry_after: Duration,
}

impl DriveClient {
    /// Creates a new DriveClient with the given access token
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token for the Drive API
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DRIVE_BASE_URL)
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            max_throttle_retries: DEFAULT_MAX_THROTTLE_RETRIES,
            default_retry_after: DEFAULT_RETRY_AFTER,
        }
    }

    /// Overrides the throttle retry budget and the fallback delay.
    pub fn with_throttle_policy(mut self, max_retries: u32, default_retry_after: Duration) -> Self {
        self.max_throttle_retries = max_retries;
        self.default_retry_after = default_retry_after;
        self
    }

    /// Updates the access token (e.g., after the identity provider rotated it)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DriveClient access token");
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to base URL (e.g., "/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Lists one page of files matching a Drive query
    ///
    /// # Arguments
    /// * `q` - Drive query language expression
    /// * `page_size` - Maximum number of files on the page
    /// * `page_token` - Continuation token from the previous page
    pub async fn list_files(
        &self,
        q: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FileList, DriveError> {
        let mut query = vec![
            ("q", q.to_string()),
            ("pageSize", page_size.to_string()),
            ("fields", LIST_FIELDS.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        debug!(q, page_size, has_page_token = page_token.is_some(), "Listing files");

        let response = self.execute(Method::GET, "/files", &query).await?;
        let list: FileList = response
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(format!("files.list: {e}")))?;

        debug!(
            count = list.files.len(),
            more = list.next_page_token.is_some(),
            "Listed files"
        );
        Ok(list)
    }

    /// Fetches a single file resource
    ///
    /// # Returns
    /// `Ok(None)` when the API answers 404
    pub async fn get_file(&self, id: &RemoteId) -> Result<Option<DriveFile>, DriveError> {
        let path = format!("/files/{}", id.as_str());
        let query = [("fields", METADATA_FIELDS.to_string())];

        match self.execute(Method::GET, &path, &query).await {
            Ok(response) => {
                let file = response
                    .json()
                    .await
                    .map_err(|e| DriveError::InvalidResponse(format!("files.get: {e}")))?;
                Ok(Some(file))
            }
            Err(err) if err.is_not_found() => {
                debug!(file_id = %id, "File not found");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Starts a content download; the body is left unread for streaming
    ///
    /// Makes `GET /files/{id}?alt=media`.
    pub async fn download(&self, id: &RemoteId) -> Result<Response, DriveError> {
        let path = format!("/files/{}", id.as_str());
        let query = [("alt", "media".to_string())];
        debug!(file_id = %id, "Opening content stream");
        self.execute(Method::GET, &path, &query).await
    }

    // ========================================================================
    // Request execution with throttle handling
    // ========================================================================

    /// Sends a request, retrying throttle responses after the advertised delay.
    ///
    /// Non-throttle failures are mapped through [`DriveError::from_status`].
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, DriveError> {
        for attempt in 0..=self.max_throttle_retries {
            let response = self
                .request(method.clone(), path)
                .query(query)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                if attempt > 0 {
                    info!(path, attempt, "Request succeeded after throttle retry");
                }
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(|v| parse_retry_after(v, self.default_retry_after))
                .unwrap_or(self.default_retry_after);
            let body = response.text().await.unwrap_or_default();

            let throttled = status == StatusCode::TOO_MANY_REQUESTS
                || (status == StatusCode::FORBIDDEN && is_rate_limit_reason(&body));
            if !throttled {
                return Err(DriveError::from_status(status, body));
            }

            if attempt >= self.max_throttle_retries {
                warn!(path, attempts = attempt + 1, "Throttle retry limit exhausted");
                return Err(DriveError::TooManyRequests { retry_after });
            }

            info!(
                path,
                attempt,
                status = status.as_u16(),
                retry_after_ms = retry_after.as_millis() as u64,
                "Throttled by Drive API, backing off"
            );
            tokio::time::sleep(retry_after).await;
        }

        Err(DriveError::InvalidResponse(format!(
            "retry loop exited unexpectedly for {path}"
        )))
    }
}
