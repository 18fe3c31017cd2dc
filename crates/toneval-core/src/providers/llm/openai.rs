use super::CompletionTransport;
use crate::errors::{require_env, LlmError};
use crate::model::RequestPayload;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Transport for the OpenAI Responses API (`POST {base_url}/responses`).
pub struct OpenAIResponses {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIResponses {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingCredential {
                var: API_KEY_VAR.to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Network {
                message: format!("failed to build http client: {}", e),
            })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Reads the credential from `OPENAI_API_KEY`; its absence is fatal.
    pub fn from_env(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let api_key = require_env(API_KEY_VAR)?;
        Self::new(base_url, api_key, timeout)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

#[async_trait]
impl CompletionTransport for OpenAIResponses {
    async fn send(&self, payload: &RequestPayload) -> Result<Value, LlmError> {
        let url = self.endpoint();
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload.to_value())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(LlmError::from_status(
                status.as_u16(),
                format!("OpenAI responses API error: {}", text.trim()),
            ));
        }

        match serde_json::from_slice::<Value>(&body) {
            Ok(json) => Ok(json),
            Err(e) => {
                tracing::warn!(error = %e, "response body is not JSON; treating as empty output");
                Ok(Value::Null)
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
