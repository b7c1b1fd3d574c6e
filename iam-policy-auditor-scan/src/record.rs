//! The policy record threaded through the audit pipeline.
//!
//! A [`PolicyRecord`] is created when a policy's default version is
//! retrieved, then widened by successive stages: redaction fills in
//! `redacted_document` and `account_mapping`, classification fills in
//! `ai_response`. Each stage consumes the record and returns a new value
//! rather than mutating shared state.

use serde::Serialize;

use crate::verdict::Verdict;

/// One substituted account identifier: `original` was replaced by
/// `substitute` everywhere it occurred in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountMapping {
    pub original: String,
    pub substitute: String,
}

/// One customer-managed policy under audit.
#[derive(Debug, Clone)]
pub struct PolicyRecord {
    /// Account that owns the policy.
    pub account: String,
    /// Full policy ARN.
    pub arn: String,
    /// Human-readable policy name.
    pub name: String,
    /// Version id of the default (active) policy version.
    pub version: String,
    /// Raw policy document as retrieved.
    pub policy: serde_json::Value,
    /// Canonical string form of `policy`, set once at construction.
    pub original_document: String,
    /// Document with account identifiers substituted. Equals
    /// `original_document` when nothing was found to redact.
    pub redacted_document: Option<String>,
    /// Trimmed raw text from the classification call.
    pub ai_response: Option<String>,
    /// Substitutions applied by redaction, in source order.
    pub account_mapping: Vec<AccountMapping>,
}

impl PolicyRecord {
    pub fn new(
        account: String,
        arn: String,
        name: String,
        version: String,
        policy: serde_json::Value,
    ) -> Self {
        let original_document = policy.to_string();
        Self {
            account,
            arn,
            name,
            version,
            policy,
            original_document,
            redacted_document: None,
            ai_response: None,
            account_mapping: Vec::new(),
        }
    }

    /// Human-readable rendering of the account mapping, e.g.
    /// `"123456789012->987654321098"`. Empty string when nothing was
    /// substituted.
    pub fn mapping_summary(&self) -> String {
        self.account_mapping
            .iter()
            .map(|m| format!("{}->{}", m.original, m.substitute))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// True iff redaction changed the document.
    pub fn is_changed(&self) -> bool {
        self.redacted_document
            .as_deref()
            .is_some_and(|redacted| redacted != self.original_document)
    }

    /// Verdict derived from the classification response. Undetermined
    /// while classification has not run.
    pub fn verdict(&self) -> Verdict {
        self.ai_response
            .as_deref()
            .map_or(Verdict::Undetermined, Verdict::interpret)
    }
}
