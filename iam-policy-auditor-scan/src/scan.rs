//! Scan orchestration: enumerate customer-managed policies and drive each
//! through redaction and classification.

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_iam::types::PolicyScopeType;
use aws_sdk_iam::Client as IamClient;
use aws_sdk_sts::Client as StsClient;

use crate::classify::PolicyClassifier;
use crate::error::{ScanError, ScanResult};
use crate::record::PolicyRecord;
use crate::redact::redact;

/// Explicit AWS credential configuration. Unset fields fall back to the
/// default provider chain.
#[derive(Debug, Default, Clone)]
pub struct AwsCredentialOverrides {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub profile: Option<String>,
    pub region: Option<String>,
}

/// What to do when a single policy's classification call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Abort the whole run; nothing is persisted.
    Abort,
    /// Keep the record unclassified, note the failure, continue.
    Isolate,
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// When on, each record is redacted and classified; when off, records
    /// are left at raw-retrieval state.
    pub redact: bool,
    pub failure_mode: FailureMode,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            redact: true,
            failure_mode: FailureMode::Abort,
        }
    }
}

/// A policy whose classification call failed in [`FailureMode::Isolate`].
#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub arn: String,
    pub name: String,
    pub reason: String,
}

/// Outcome of a scan: every retrieved record in source pagination order,
/// plus classification failures when they were isolated.
#[derive(Debug)]
pub struct ScanReport {
    pub account: String,
    pub records: Vec<PolicyRecord>,
    pub failures: Vec<ScanFailure>,
}

/// Holds the AWS clients for one scan run.
pub struct Scanner {
    iam_client: IamClient,
    sts_client: StsClient,
}

impl Scanner {
    /// Load AWS configuration once and build IAM and STS clients.
    /// Credential resolution itself is lazy; [`Scanner::run`] verifies it
    /// by resolving the caller identity before any listing work.
    pub async fn new(overrides: &AwsCredentialOverrides) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = &overrides.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &overrides.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let (Some(access_key_id), Some(secret_access_key)) =
            (&overrides.access_key_id, &overrides.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::from_keys(
                access_key_id.clone(),
                secret_access_key.clone(),
                overrides.session_token.clone(),
            ));
        }
        let config = loader.load().await;

        Self {
            iam_client: IamClient::new(&config),
            sts_client: StsClient::new(&config),
        }
    }

    /// Resolve the active account id. Fails with a credential error when
    /// the configured profile or keys cannot be used.
    pub async fn caller_account(&self) -> ScanResult<String> {
        let identity = self
            .sts_client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                ScanError::Credentials(format!("could not resolve caller identity: {e}"))
            })?;
        identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| {
                ScanError::Credentials("caller identity did not include an account id".to_string())
            })
    }

    /// Enumerate all customer-managed (Scope=Local) policies and, when
    /// redaction is enabled, drive each through redaction and
    /// classification. Pagination is consumed exhaustively; records keep
    /// source order.
    pub async fn run(
        &self,
        options: &ScanOptions,
        classifier: &PolicyClassifier,
    ) -> ScanResult<ScanReport> {
        let account = self.caller_account().await?;
        log::info!("Retrieving and redacting policies for account: {account}");

        let mut records = Vec::new();
        let mut failures = Vec::new();

        let mut pages = self
            .iam_client
            .list_policies()
            .scope(PolicyScopeType::Local)
            .only_attached(false)
            .into_paginator()
            .items()
            .send();

        while let Some(item) = pages.next().await {
            let policy = item
                .map_err(|e| ScanError::Listing(format!("failed to list policies: {e}")))?;

            let Some(arn) = policy.arn().map(str::to_string) else {
                continue;
            };
            if is_managed_arn(&arn) {
                continue;
            }
            let name = policy.policy_name().unwrap_or_default().to_string();
            let Some(default_version_id) = policy.default_version_id() else {
                continue;
            };

            let (version, document) = self.default_version(&arn, default_version_id).await?;
            let record = PolicyRecord::new(account.clone(), arn, name, version, document);

            if !options.redact {
                records.push(record);
                continue;
            }

            let record = redact(record);
            classify_or_isolate(
                classifier,
                record,
                options.failure_mode,
                &mut records,
                &mut failures,
            )
            .await?;
        }

        Ok(ScanReport {
            account,
            records,
            failures,
        })
    }

    /// Fetch and parse a policy's default document version. AWS returns
    /// the document URL-encoded.
    async fn default_version(
        &self,
        arn: &str,
        version_id: &str,
    ) -> ScanResult<(String, serde_json::Value)> {
        let response = self
            .iam_client
            .get_policy_version()
            .policy_arn(arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| {
                ScanError::Listing(format!("failed to get policy version for '{arn}': {e}"))
            })?;

        let version = response.policy_version().ok_or_else(|| {
            ScanError::Listing(format!("no policy version returned for '{arn}'"))
        })?;
        let encoded = version.document().ok_or_else(|| {
            ScanError::Listing(format!("policy version for '{arn}' had no document"))
        })?;

        let decoded = percent_encoding::percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|e| {
                ScanError::Listing(format!("failed to URL-decode document for '{arn}': {e}"))
            })?;
        let document = serde_json::from_str(&decoded).map_err(|e| {
            ScanError::Listing(format!("failed to parse document for '{arn}': {e}"))
        })?;

        Ok((version.version_id().unwrap_or(version_id).to_string(), document))
    }
}

/// Classify one redacted record, honoring the failure mode. On success
/// the classified record joins `records`; in [`FailureMode::Isolate`] a
/// failing record is kept unclassified and the failure noted; in
/// [`FailureMode::Abort`] the error propagates and ends the run.
async fn classify_or_isolate(
    classifier: &PolicyClassifier,
    record: PolicyRecord,
    failure_mode: FailureMode,
    records: &mut Vec<PolicyRecord>,
    failures: &mut Vec<ScanFailure>,
) -> ScanResult<()> {
    match classifier.classify(record.clone()).await {
        Ok(classified) => records.push(classified),
        Err(err) if failure_mode == FailureMode::Isolate => {
            log::warn!("Skipping classification for policy {}: {err}", record.name);
            failures.push(ScanFailure {
                arn: record.arn.clone(),
                name: record.name.clone(),
                reason: err.to_string(),
            });
            records.push(record);
        }
        Err(err) => return Err(err),
    }
    Ok(())
}

/// AWS-managed policies live in the reserved `aws` namespace and are
/// excluded from audit.
pub fn is_managed_arn(arn: &str) -> bool {
    arn.starts_with("arn:aws:iam::aws")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassifierConfig, DEFAULT_MODEL};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn redacted_record(name: &str) -> PolicyRecord {
        redact(PolicyRecord::new(
            "123456789012".to_string(),
            format!("arn:aws:iam::123456789012:policy/{name}"),
            name.to_string(),
            "v1".to_string(),
            serde_json::json!({
                "Statement": [{"Resource": "arn:aws:s3:::123456789012-bucket"}]
            }),
        ))
    }

    fn classifier_for(server: &MockServer) -> PolicyClassifier {
        PolicyClassifier::new(
            ClassifierConfig::new("test-key".to_string(), DEFAULT_MODEL.to_string())
                .with_endpoint(server.uri()),
        )
    }

    // First call answers, every later call fails.
    async fn succeed_once_then_fail(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"text": "No, permissions are scoped correctly"}]
            })))
            .up_to_n_times(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn isolate_mode_keeps_failing_records_and_reports_them() {
        let server = MockServer::start().await;
        succeed_once_then_fail(&server).await;
        let classifier = classifier_for(&server);

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for name in ["first", "second"] {
            classify_or_isolate(
                &classifier,
                redacted_record(name),
                FailureMode::Isolate,
                &mut records,
                &mut failures,
            )
            .await
            .expect("isolation must not abort the run");
        }

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "first");
        assert!(records[0].ai_response.is_some());
        assert_eq!(records[1].name, "second");
        assert!(records[1].ai_response.is_none());
        assert!(records[1].redacted_document.is_some());

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "second");
        assert_eq!(failures[0].arn, "arn:aws:iam::123456789012:policy/second");
        assert!(!failures[0].reason.is_empty());
    }

    #[tokio::test]
    async fn abort_mode_propagates_the_first_failure() {
        let server = MockServer::start().await;
        succeed_once_then_fail(&server).await;
        let classifier = classifier_for(&server);

        let mut records = Vec::new();
        let mut failures = Vec::new();
        let mut outcome = Ok(());
        for name in ["first", "second"] {
            outcome = classify_or_isolate(
                &classifier,
                redacted_record(name),
                FailureMode::Abort,
                &mut records,
                &mut failures,
            )
            .await;
            if outcome.is_err() {
                break;
            }
        }

        assert!(matches!(
            outcome,
            Err(ScanError::Classification { ref name, .. }) if name == "second"
        ));
        assert_eq!(records.len(), 1);
        assert!(failures.is_empty());
    }

    #[test]
    fn managed_arns_are_excluded() {
        assert!(is_managed_arn("arn:aws:iam::aws:policy/AdministratorAccess"));
        assert!(!is_managed_arn("arn:aws:iam::123456789012:policy/custom"));
    }

    #[test]
    fn default_options_redact_and_abort() {
        let options = ScanOptions::default();
        assert!(options.redact);
        assert_eq!(options.failure_mode, FailureMode::Abort);
    }
}
