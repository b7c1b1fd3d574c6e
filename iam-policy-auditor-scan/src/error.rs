//! Error types for the policy audit pipeline.

use thiserror::Error;

/// Errors that can occur while scanning an account's policies.
#[derive(Debug, Error)]
pub enum ScanError {
    /// AWS credentials could not be resolved (bad profile, missing keys).
    /// Raised before any policy retrieval is attempted.
    #[error("AWS credential configuration error: {0}")]
    Credentials(String),

    /// Listing policies or fetching a policy version failed.
    #[error("Policy retrieval error: {0}")]
    Listing(String),

    /// The classification call for a policy failed or returned an
    /// unusable response.
    #[error("Classification failed for policy '{name}': {reason}")]
    Classification { name: String, reason: String },

    /// Writing the result file failed.
    #[error("Failed to write results: {0}")]
    Output(String),
}

impl ScanError {
    /// Process exit code for this error. Credential errors and retrieval
    /// errors get distinct codes so wrappers can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScanError::Credentials(_) => 1,
            ScanError::Listing(_) => 2,
            ScanError::Classification { .. } => 3,
            ScanError::Output(_) => 4,
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
