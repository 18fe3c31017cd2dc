//! Fingerprint cache: an append-only JSONL log mirrored by an in-memory index.
//!
//! The log is the write-ahead record of every completion ever obtained. It is
//! read fully at startup; each `append` writes one line, flushes, and only then
//! publishes the record to the index, all under a single lock so readers never
//! observe a record that is not durable and lines never interleave.

pub mod key;

use crate::errors::LlmError;
use crate::model::CacheRecord;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub struct ResponseCache {
    path: PathBuf,
    index: Mutex<HashMap<String, CacheRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub records: usize,
    pub by_model: BTreeMap<String, usize>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl ResponseCache {
    /// Load the log at `path`. A missing file yields an empty cache; blank or
    /// malformed lines are skipped.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, LlmError> {
        let path = path.into();
        let mut index = HashMap::new();

        match fs::read(&path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                let mut skipped = 0usize;
                for (line_no, line) in content.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<CacheRecord>(line) {
                        Ok(record) => {
                            index.insert(record.request_id.clone(), record);
                        }
                        Err(e) => {
                            skipped += 1;
                            tracing::debug!(line = line_no + 1, error = %e, "skipping malformed cache line");
                        }
                    }
                }
                tracing::debug!(
                    path = %path.display(),
                    records = index.len(),
                    skipped,
                    "response cache loaded"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(LlmError::Cache {
                    message: format!("failed to read {}: {}", path.display(), e),
                })
            }
        }

        Ok(Self {
            path,
            index: Mutex::new(index),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lookup(&self, request_id: &str) -> Option<CacheRecord> {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request_id)
            .cloned()
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(request_id)
    }

    /// Append one record to the log and publish it to the index.
    pub fn append(&self, record: CacheRecord) -> Result<(), LlmError> {
        let line = serde_json::to_string(&record).map_err(|e| LlmError::Cache {
            message: format!("failed to serialize cache record: {}", e),
        })?;

        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_line(&line).map_err(|e| LlmError::Cache {
            message: format!("failed to append to {}: {}", self.path.display(), e),
        })?;
        index.insert(record.request_id.clone(), record);
        Ok(())
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{line}\n").as_bytes())?;
        file.flush()
    }

    pub fn len(&self) -> usize {
        self.index.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats = CacheStats {
            records: index.len(),
            ..Default::default()
        };
        for record in index.values() {
            *stats.by_model.entry(record.model.clone()).or_default() += 1;
            stats.input_tokens += record.usage.input_tokens.unwrap_or(0);
            stats.output_tokens += record.usage.output_tokens.unwrap_or(0);
            stats.total_tokens += record.usage.total_tokens.unwrap_or(0);
        }
        stats
    }
}
