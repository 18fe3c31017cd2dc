//! Scripted transport used by tests and offline dry runs.

use super::CompletionTransport;
use crate::errors::LlmError;
use crate::model::RequestPayload;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

type Responder = dyn Fn(&RequestPayload) -> Result<String, LlmError> + Send + Sync;

/// Answers each request from a queue of scripted replies, or from a responder
/// function once the queue is empty. Records every payload it receives.
pub struct FakeTransport {
    scripted: Mutex<VecDeque<Result<String, LlmError>>>,
    responder: Option<Arc<Responder>>,
    calls: AtomicUsize,
    payloads: Mutex<Vec<RequestPayload>>,
    latency: Option<Duration>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            responder: None,
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Reply with these texts in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fake = Self::new();
        {
            let mut q = fake.scripted.lock().unwrap_or_else(PoisonError::into_inner);
            q.extend(replies.into_iter().map(|r| Ok(r.into())));
        }
        fake
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&RequestPayload) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        let mut fake = Self::new();
        fake.responder = Some(Arc::new(responder));
        fake
    }

    /// Fails every call with a retryable server error.
    pub fn always_failing() -> Self {
        Self::with_responder(|_| {
            Err(LlmError::Server {
                status: 503,
                message: "service unavailable".into(),
            })
        })
    }

    /// Echoes `Final: <n>` where n is the user prompt length. Used for `--dry-run`.
    pub fn echo() -> Self {
        Self::with_responder(|p| {
            let n = p.user_content().map(str::len).unwrap_or(0);
            Ok(format!("offline reply\nFinal: {n}"))
        })
    }

    pub fn push_reply(&self, reply: Result<String, LlmError>) {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<RequestPayload> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionTransport for FakeTransport {
    async fn send(&self, payload: &RequestPayload) -> Result<Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self
            .scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let text = match (next, &self.responder) {
            (Some(reply), _) => reply?,
            (None, Some(responder)) => (**responder)(payload)?,
            (None, None) => {
                return Err(LlmError::Rejected {
                    status: 400,
                    message: "no more scripted replies".into(),
                })
            }
        };

        let input_tokens = payload.user_content().map(|u| u.len() as u64).unwrap_or(0);
        let output_tokens = text.len() as u64;
        Ok(json!({
            "output": [{
                "type": "message",
                "content": [{"type": "output_text", "text": text}]
            }],
            "usage": {
                "input_tokens": input_tokens,
                "output_tokens": output_tokens,
                "total_tokens": input_tokens + output_tokens
            }
        }))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
