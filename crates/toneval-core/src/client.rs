//! Request-caching LLM client.
//!
//! `generate` makes at most one network call per unique request payload over
//! the lifetime of the cache log, including across process restarts.
//! Concurrent callers with the same fingerprint share one in-flight call.

use crate::cache::key::request_fingerprint;
use crate::cache::ResponseCache;
use crate::engine::retry::CallExecutor;
use crate::errors::LlmError;
use crate::model::{CacheRecord, LlmResult, RequestPayload};
use crate::providers::llm::{response_text, response_usage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub struct LlmClient {
    cache: Arc<ResponseCache>,
    executor: CallExecutor,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LlmClient {
    pub fn new(cache: Arc<ResponseCache>, executor: CallExecutor) -> Self {
        Self {
            cache,
            executor,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn provider_name(&self) -> &'static str {
        self.executor.provider_name()
    }

    pub async fn generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f64,
        max_output_tokens: u32,
    ) -> Result<LlmResult, LlmError> {
        let payload = RequestPayload::chat(model, system, user, temperature, max_output_tokens);
        self.generate_payload(&payload).await
    }

    pub async fn generate_payload(&self, payload: &RequestPayload) -> Result<LlmResult, LlmError> {
        let prompt = payload.to_value();
        let request_id = request_fingerprint(&prompt);

        if let Some(hit) = self.cache.lookup(&request_id) {
            debug!(request_id = %request_id, "cache hit");
            return Ok(LlmResult::from_cache(&hit));
        }

        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(request_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let turn = gate.lock().await;

        // Another caller may have completed this request while we waited.
        let result = match self.cache.lookup(&request_id) {
            Some(hit) => {
                debug!(request_id = %request_id, "cache hit after in-flight wait");
                Ok(LlmResult::from_cache(&hit))
            }
            None => self.fetch(payload, prompt, &request_id).await,
        };
        drop(turn);
        self.release(&request_id, &gate).await;
        result
    }

    /// Drop the gate from the in-flight map once no other caller holds it.
    /// While anyone is still queued, newcomers must find the same gate.
    async fn release(&self, request_id: &str, gate: &Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().await;
        // the map's copy plus ours
        if Arc::strong_count(gate) == 2 {
            inflight.remove(request_id);
        }
    }

    async fn fetch(
        &self,
        payload: &RequestPayload,
        prompt: serde_json::Value,
        request_id: &str,
    ) -> Result<LlmResult, LlmError> {
        debug!(request_id = %request_id, model = %payload.model, "cache miss; calling provider");
        let response = self.executor.call(payload).await?;
        let text = response_text(&response);
        let usage = response_usage(&response);

        let record = CacheRecord {
            request_id: request_id.to_string(),
            timestamp: now_iso(),
            model: payload.model.clone(),
            prompt: prompt.clone(),
            response_text: text.clone(),
            usage: usage.clone(),
        };
        self.cache.append(record)?;

        Ok(LlmResult {
            request_id: request_id.to_string(),
            model: payload.model.clone(),
            prompt,
            response_text: text,
            usage,
            cached: false,
        })
    }
}

/// Local time, second precision (`2025-01-31T09:15:02`).
pub fn now_iso() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::retry::RetryPolicy;
    use crate::providers::llm::fake::FakeTransport;
    use std::time::Duration;
    use tempfile::tempdir;

    fn client_with(fake: Arc<FakeTransport>, path: &std::path::Path) -> LlmClient {
        let cache = Arc::new(ResponseCache::load(path).unwrap());
        LlmClient::new(cache, CallExecutor::new(fake, RetryPolicy::default()))
    }

    #[tokio::test]
    async fn identical_requests_cost_one_network_call() {
        let dir = tempdir().unwrap();
        let fake = Arc::new(FakeTransport::with_replies(["Final: 42"]));
        let client = client_with(fake.clone(), &dir.path().join("cache.jsonl"));

        let first = client.generate("m", "sys", "q", 0.0, 64).await.unwrap();
        let second = client.generate("m", "sys", "q", 0.0, 64).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.response_text, second.response_text);
        assert_eq!(first.usage, second.usage);
        assert_eq!(first.request_id, second.request_id);
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn cache_survives_a_fresh_client() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.jsonl");
        let fake = Arc::new(FakeTransport::with_replies(["one", "two", "three"]));
        let client = client_with(fake.clone(), &path);
        let mut before = Vec::new();
        for q in ["a", "b", "c"] {
            before.push(client.generate("m", "sys", q, 0.0, 64).await.unwrap());
        }
        drop(client);

        let offline = Arc::new(FakeTransport::always_failing());
        let restarted = client_with(offline.clone(), &path);
        for (q, prev) in ["a", "b", "c"].into_iter().zip(before) {
            let again = restarted.generate("m", "sys", q, 0.0, 64).await.unwrap();
            assert!(again.cached);
            assert_eq!(again.response_text, prev.response_text);
            assert_eq!(again.usage, prev.usage);
        }
        assert_eq!(offline.calls(), 0);
    }

    #[tokio::test]
    async fn any_parameter_change_is_a_new_request() {
        let dir = tempdir().unwrap();
        let fake = Arc::new(FakeTransport::echo());
        let client = client_with(fake.clone(), &dir.path().join("cache.jsonl"));

        client.generate("m", "sys", "q", 0.0, 64).await.unwrap();
        client.generate("m2", "sys", "q", 0.0, 64).await.unwrap();
        client.generate("m", "sys2", "q", 0.0, 64).await.unwrap();
        client.generate("m", "sys", "q2", 0.0, 64).await.unwrap();
        client.generate("m", "sys", "q", 0.7, 64).await.unwrap();
        client.generate("m", "sys", "q", 0.0, 128).await.unwrap();
        assert_eq!(fake.calls(), 6);
    }

    #[tokio::test]
    async fn failed_calls_are_not_cached() {
        let dir = tempdir().unwrap();
        let fake = Arc::new(FakeTransport::new());
        fake.push_reply(Err(LlmError::Rejected {
            status: 400,
            message: "bad".into(),
        }));
        fake.push_reply(Ok("Final: 5".into()));
        let client = client_with(fake.clone(), &dir.path().join("cache.jsonl"));

        assert!(client.generate("m", "s", "q", 0.0, 8).await.is_err());
        assert!(client.cache().is_empty());
        let ok = client.generate("m", "s", "q", 0.0, 8).await.unwrap();
        assert!(!ok.cached);
        assert_eq!(ok.response_text, "Final: 5");
    }

    /// Always rejects, after a delay, and records the peak number of
    /// overlapping `send` calls.
    struct OverlapGauge {
        active: std::sync::atomic::AtomicUsize,
        peak: std::sync::atomic::AtomicUsize,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::providers::llm::CompletionTransport for OverlapGauge {
        async fn send(&self, _payload: &RequestPayload) -> Result<serde_json::Value, LlmError> {
            use std::sync::atomic::Ordering::SeqCst;
            self.calls.fetch_add(1, SeqCst);
            let now = self.active.fetch_add(1, SeqCst) + 1;
            self.peak.fetch_max(now, SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.active.fetch_sub(1, SeqCst);
            Err(LlmError::Rejected {
                status: 400,
                message: "nope".into(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "gauge"
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failed_call_does_not_open_a_second_gate() {
        use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};

        let dir = tempdir().unwrap();
        let gauge = Arc::new(OverlapGauge {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(ResponseCache::load(dir.path().join("cache.jsonl")).unwrap());
        let client = Arc::new(LlmClient::new(
            cache,
            CallExecutor::new(gauge.clone(), RetryPolicy::default()),
        ));

        // the third caller arrives while the second is still queued behind
        // the first, failed, call
        let mut handles = Vec::new();
        for delay in [0u64, 10, 65] {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                client.generate("m", "s", "same", 0.0, 8).await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().is_err());
        }

        assert_eq!(gauge.peak.load(SeqCst), 1);
        assert_eq!(gauge.calls.load(SeqCst), 3);
        assert!(client.inflight.lock().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_identical_requests_share_one_call() {
        let dir = tempdir().unwrap();
        let fake = Arc::new(FakeTransport::echo().with_latency(Duration::from_millis(50)));
        let client = Arc::new(client_with(fake.clone(), &dir.path().join("cache.jsonl")));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                client.generate("m", "s", "same", 0.0, 8).await.unwrap()
            }));
        }
        let mut texts = Vec::new();
        for h in handles {
            texts.push(h.await.unwrap().response_text);
        }

        assert_eq!(fake.calls(), 1);
        assert!(texts.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(client.cache().len(), 1);
    }
}
