pub mod completions;
pub mod config;
pub mod credentials;
pub mod sync;
