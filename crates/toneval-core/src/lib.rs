//! Request-caching LLM client and experiment engine for comparing prompting
//! conditions (tone, reasoning strategy, critique severity) on GSM8K and ARC.
//!
//! - Fingerprint cache: every request payload is hashed and its response
//!   persisted to an append-only JSONL log, so re-runs replay instead of
//!   calling the endpoint again
//! - Call executor with bounded exponential-backoff retry on transient errors
//! - Condition pipelines: direct, chain-of-thought, decompose-and-solve,
//!   critique-and-revise, self-consistency
//! - Experiment driver with per-example failure isolation
//! - Accuracy summaries and paired-bootstrap comparisons
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use toneval_core::cache::ResponseCache;
//! use toneval_core::client::LlmClient;
//! use toneval_core::engine::retry::{CallExecutor, RetryPolicy};
//! use toneval_core::providers::llm::openai::{OpenAIResponses, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let transport = Arc::new(OpenAIResponses::from_env(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)?);
//! let cache = Arc::new(ResponseCache::load("results/model_outputs/cache.jsonl")?);
//! let client = LlmClient::new(cache, CallExecutor::new(transport, RetryPolicy::default()));
//!
//! let res = client
//!     .generate("gpt-4.1", "You are a helpful assistant.", "2+2?", 0.0, 256)
//!     .await?;
//! println!("{} (cached: {})", res.response_text, res.cached);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `OPENAI_API_KEY` | Bearer credential; required for live runs |
//! | `OPENAI_BASE_URL` | Endpoint base URL (default: `https://api.openai.com/v1`) |
//! | `OPENAI_MODEL` | Model used by the CLI (default: `gpt-4.1`) |

pub mod cache;
pub mod client;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod model;
pub mod pipeline;
pub mod providers;
pub mod report;

pub use client::LlmClient;
pub use errors::{ErrorKind, LlmError};
pub use model::{LlmResult, RequestPayload, Usage};
