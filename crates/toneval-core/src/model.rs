use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The exact parameters sent to the model endpoint.
///
/// Its canonical serialization (see [`crate::cache::key`]) is the only input to
/// the request fingerprint, and it doubles as the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub model: String,
    pub input: Vec<Message>,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl RequestPayload {
    /// System message first, user message second.
    pub fn chat(
        model: &str,
        system: &str,
        user: &str,
        temperature: f64,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            model: model.to_string(),
            input: vec![
                Message {
                    role: Role::System,
                    content: system.to_string(),
                },
                Message {
                    role: Role::User,
                    content: user.to_string(),
                },
            ],
            temperature,
            max_output_tokens,
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": self.input,
            "temperature": self.temperature,
            "max_output_tokens": self.max_output_tokens,
        })
    }

    pub fn fingerprint(&self) -> String {
        crate::cache::key::request_fingerprint(&self.to_value())
    }

    /// Content of the user message, if any.
    pub fn user_content(&self) -> Option<&str> {
        self.input
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Token accounting reported by the endpoint. Fields absent when not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl Usage {
    pub fn is_empty(&self) -> bool {
        self.input_tokens.is_none() && self.output_tokens.is_none() && self.total_tokens.is_none()
    }
}

/// One line of the durable cache log. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub request_id: String,
    pub timestamp: String,
    pub model: String,
    pub prompt: serde_json::Value,
    pub response_text: String,
    #[serde(default)]
    pub usage: Usage,
}

/// Outcome of a single `generate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResult {
    pub request_id: String,
    pub model: String,
    pub prompt: serde_json::Value,
    pub response_text: String,
    pub usage: Usage,
    pub cached: bool,
}

impl LlmResult {
    pub fn from_cache(record: &CacheRecord) -> Self {
        Self {
            request_id: record.request_id.clone(),
            model: record.model.clone(),
            prompt: record.prompt.clone(),
            response_text: record.response_text.clone(),
            usage: record.usage.clone(),
            cached: true,
        }
    }
}
