pub mod fake;
pub mod openai;

use crate::errors::LlmError;
use crate::model::{RequestPayload, Usage};
use async_trait::async_trait;
use serde_json::Value;

/// One network round trip to a completion endpoint. No retry, no caching.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn send(&self, payload: &RequestPayload) -> Result<Value, LlmError>;

    fn provider_name(&self) -> &'static str;
}

/// Extract the response text.
///
/// A non-empty top-level `output_text` wins. Otherwise every `output_text`
/// part of every `message` output item is collected in emission order and
/// joined with newlines. Unknown shapes yield an empty string.
pub fn response_text(response: &Value) -> String {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        if !text.is_empty() {
            return text.to_string();
        }
    }

    let mut texts: Vec<&str> = Vec::new();
    let items = response
        .get("output")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for item in items {
        if item.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        let parts = item
            .get("content")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for part in parts {
            if part.get("type").and_then(Value::as_str) == Some("output_text") {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    texts.push(text);
                }
            }
        }
    }
    texts.join("\n").trim().to_string()
}

pub fn response_usage(response: &Value) -> Usage {
    let Some(usage) = response.get("usage").filter(|u| u.is_object()) else {
        return Usage::default();
    };
    Usage {
        input_tokens: usage.get("input_tokens").and_then(Value::as_u64),
        output_tokens: usage.get("output_tokens").and_then(Value::as_u64),
        total_tokens: usage.get("total_tokens").and_then(Value::as_u64),
    }
}
