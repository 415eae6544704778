//! gdmirror Core - Domain types, configuration and ports
//!
//! This crate is the hexagonal core of the mirror:
//! - **Domain types** - `RemoteObject`, `LocalFolderRecord`, `LocalFileRecord`, credentials
//! - **Port definitions** - `IRemoteDrive`, `ICredentialValidator`
//! - **Configuration** - the YAML `Config` with validation and a builder
//!
//! Adapter crates (`gdmirror-gdrive`, `gdmirror-cache`) and the engine
//! (`gdmirror-sync`) depend on this crate, never the other way round.

pub mod config;
pub mod domain;
pub mod ports;
