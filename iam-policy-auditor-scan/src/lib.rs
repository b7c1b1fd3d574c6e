//! Core library for the IAM policy auditor:
//! - account-identifier redaction with an audit mapping
//! - vulnerability classification via a text-completion service
//! - tri-state verdict interpretation of the model's free-text answer
//! - scan orchestration over an account's customer-managed policies
//! - CSV/JSON result persistence

mod classify;
mod error;
mod output;
mod record;
mod redact;
mod scan;
mod verdict;

// Re-exports for a small, focused public API
pub use classify::{ClassifierConfig, PolicyClassifier, DEFAULT_MODEL, OPENAI_API_BASE};
pub use error::{ScanError, ScanResult};
pub use output::{default_output_path, write_results, OutputFormat, CSV_HEADER};
pub use record::{AccountMapping, PolicyRecord};
pub use redact::redact;
pub use scan::{
    is_managed_arn, AwsCredentialOverrides, FailureMode, ScanFailure, ScanOptions, ScanReport,
    Scanner,
};
pub use verdict::Verdict;
