//! Credential validator port
//!
//! The orchestrator treats invalid credentials as a fatal precondition and
//! refuses to issue any remote call. What "valid" means is up to the
//! implementation; the stock one lives in
//! [`crate::domain::credentials::ServiceAccountValidator`].

use serde::{Deserialize, Serialize};

use crate::domain::credentials::ServiceAccountCredentials;

/// Outcome of a credential check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialReport {
    /// True when `errors` is empty
    pub is_valid: bool,
    /// One human-readable message per failed rule
    pub errors: Vec<String>,
}

impl CredentialReport {
    /// Builds a report whose validity is derived from the error list
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Port trait for credential format validation
pub trait ICredentialValidator: Send + Sync {
    /// Checks the credentials without contacting any remote service
    fn validate(&self, credentials: &ServiceAccountCredentials) -> CredentialReport;
}
