//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the sync engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteDrive`] - Read-only cloud drive access (Google Drive v3)
//! - [`ICredentialValidator`] - Credential format checks before any remote call

pub mod credential_validator;
pub mod remote_drive;

pub use credential_validator::{CredentialReport, ICredentialValidator};
pub use remote_drive::{ByteStream, IRemoteDrive, ListQuery, ObjectPage};
