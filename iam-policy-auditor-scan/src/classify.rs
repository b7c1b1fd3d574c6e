//! Vulnerability classification via an OpenAI-style completions API.

use serde::{Deserialize, Serialize};

use crate::error::{ScanError, ScanResult};
use crate::record::PolicyRecord;
use crate::verdict::Verdict;

/// Default completions API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com";

/// Default model used for classification.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";

/// Configuration for the classification client. Passed in explicitly;
/// there is no ambient API-key state.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub model: String,
    /// API base URL, overridable so tests can point at a local server.
    pub endpoint: String,
}

impl ClassifierConfig {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            endpoint: OPENAI_API_BASE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Client for the text-generation service. One synchronous request per
/// policy, fixed sampling parameters, no streaming.
pub struct PolicyClassifier {
    http: reqwest::Client,
    config: ClassifierConfig,
}

impl PolicyClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Ask the model whether the redacted document is vulnerable and
    /// attach its trimmed answer to the record. Requires redaction to
    /// have run first, even when it substituted nothing.
    pub async fn classify(&self, record: PolicyRecord) -> ScanResult<PolicyRecord> {
        let document = record.redacted_document.as_deref().ok_or_else(|| {
            ScanError::Classification {
                name: record.name.clone(),
                reason: "document has not been redacted".to_string(),
            }
        })?;

        let request = CompletionRequest {
            model: &self.config.model,
            prompt: format!(
                "Evaluate AWS Policy for Vulnerability. Start answer with 'Yes, ' or 'No, '.\nPolicy:\n \n{document}"
            ),
            temperature: 0.5,
            max_tokens: 1000,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/v1/completions", self.config.endpoint))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.error_for(&record, format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| self.error_for(&record, format!("service returned error status: {e}")))?;

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| self.error_for(&record, format!("unparsable response body: {e}")))?;

        let text = body
            .choices
            .first()
            .map(|choice| choice.text.trim().to_string())
            .ok_or_else(|| self.error_for(&record, "response contained no choices".to_string()))?;

        log::info!("Policy {} [{}]", record.name, Verdict::interpret(&text));

        Ok(PolicyRecord {
            ai_response: Some(text),
            ..record
        })
    }

    fn error_for(&self, record: &PolicyRecord, reason: String) -> ScanError {
        ScanError::Classification {
            name: record.name.clone(),
            reason,
        }
    }
}
