//! Integration tests for gdmirror-gdrive
//!
//! Uses wiremock to simulate the Drive v3 API and verifies end-to-end
//! behavior of the DriveClient and the GoogleDriveProvider: paged listings,
//! metadata lookups, streamed downloads and throttle handling.


mod test_content;
mod test_listing;
mod test_metadata;
mod test_throttle;
