//! Interpretation of the model's free-text answer.
//!
//! The contract with the model is a soft natural-language convention: the
//! prompt asks it to start with `"Yes, "` or `"No, "`. This module is the
//! single seam that maps that convention to a verdict, so a future move to
//! a structured response schema touches nothing else.

use std::fmt;

use serde::Serialize;

/// Tri-state vulnerability verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "VULNERABLE")]
    Vulnerable,
    #[serde(rename = "NOT VULNERABLE")]
    NotVulnerable,
    #[serde(rename = "UNDETERMINED")]
    Undetermined,
}

impl Verdict {
    /// Map a raw response to a verdict. `"Yes,"` wins over `"No,"` when a
    /// response contains both; the match is a substring check, not
    /// anchored to the start, since models often add a preamble.
    pub fn interpret(response: &str) -> Self {
        if response.contains("Yes,") {
            Verdict::Vulnerable
        } else if response.contains("No,") {
            Verdict::NotVulnerable
        } else {
            Verdict::Undetermined
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Vulnerable => "VULNERABLE",
            Verdict::NotVulnerable => "NOT VULNERABLE",
            Verdict::Undetermined => "UNDETERMINED",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_prefix_is_vulnerable() {
        assert_eq!(
            Verdict::interpret("Yes, the policy grants overly broad s3:*"),
            Verdict::Vulnerable
        );
    }

    #[test]
    fn no_prefix_is_not_vulnerable() {
        assert_eq!(
            Verdict::interpret("No, permissions are scoped correctly"),
            Verdict::NotVulnerable
        );
    }

    #[test]
    fn anything_else_is_undetermined() {
        assert_eq!(Verdict::interpret("Unable to determine"), Verdict::Undetermined);
        assert_eq!(Verdict::interpret(""), Verdict::Undetermined);
        assert_eq!(Verdict::interpret("Yes and no"), Verdict::Undetermined);
    }

    #[test]
    fn yes_wins_when_both_tokens_present() {
        assert_eq!(
            Verdict::interpret("No, wait. Yes, the wildcard resource is a problem"),
            Verdict::Vulnerable
        );
    }

    #[test]
    fn match_is_not_anchored_to_start() {
        assert_eq!(
            Verdict::interpret("After review: Yes, this policy is vulnerable"),
            Verdict::Vulnerable
        );
    }

    #[test]
    fn interpretation_is_idempotent() {
        let response = "Yes, wildcard actions";
        assert_eq!(
            Verdict::interpret(response),
            Verdict::interpret(response)
        );
    }

    #[test]
    fn display_labels() {
        assert_eq!(Verdict::Vulnerable.to_string(), "VULNERABLE");
        assert_eq!(Verdict::NotVulnerable.to_string(), "NOT VULNERABLE");
        assert_eq!(Verdict::Undetermined.to_string(), "UNDETERMINED");
    }
}
