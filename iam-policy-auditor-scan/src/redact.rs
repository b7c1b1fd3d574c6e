//! Account-identifier redaction.
//!
//! Before a policy document leaves the account boundary it is scanned for
//! 12-digit account identifiers. Every distinct identifier found is
//! replaced, everywhere it occurs, with its own randomly drawn 12-digit
//! substitute, and the substitutions are recorded on the record so an
//! auditor can reverse them from the persisted output.

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;

use crate::record::{AccountMapping, PolicyRecord};

static ACCOUNT_ID: OnceLock<Regex> = OnceLock::new();

fn account_id_pattern() -> &'static Regex {
    ACCOUNT_ID.get_or_init(|| Regex::new(r"\b\d{12}\b").expect("account id regex"))
}

/// Redact account identifiers from the record's document.
///
/// Sets `redacted_document` and `account_mapping`. A document with no
/// 12-digit token passes through unchanged with an empty mapping; that is
/// a normal path, not a failure.
pub fn redact(record: PolicyRecord) -> PolicyRecord {
    let mut distinct: Vec<String> = Vec::new();
    for found in account_id_pattern().find_iter(&record.original_document) {
        let token = found.as_str().to_string();
        if !distinct.contains(&token) {
            distinct.push(token);
        }
    }

    let mut redacted = record.original_document.clone();
    let mut mapping = Vec::with_capacity(distinct.len());
    for original in distinct {
        let substitute = substitute_account_id(&redacted, &original);
        redacted = redacted.replace(&original, &substitute);
        mapping.push(AccountMapping {
            original,
            substitute,
        });
    }

    PolicyRecord {
        redacted_document: Some(redacted),
        account_mapping: mapping,
        ..record
    }
}

/// Draw a random 12-digit account id that differs from `original` and does
/// not already occur in `document` (a substitute colliding with another
/// identifier would merge two mappings).
fn substitute_account_id(document: &str, original: &str) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let candidate = rng.gen_range(100_000_000_000u64..=999_999_999_999).to_string();
        if candidate != original && !document.contains(&candidate) {
            return candidate;
        }
    }
}
