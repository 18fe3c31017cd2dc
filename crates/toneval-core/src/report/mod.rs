pub mod analysis;
pub mod bootstrap;
pub mod progress;
pub mod summary;

use crate::dataset::DatasetKind;
use crate::engine::record::ConditionRecord;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where a run reads and writes its artifacts, relative to the results root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLayout {
    root: PathBuf,
}

impl ResultsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_log(&self) -> PathBuf {
        self.root.join("model_outputs").join("cache.jsonl")
    }

    /// Offline replies never share a log with endpoint responses.
    pub fn dry_run_cache_log(&self) -> PathBuf {
        self.root.join("model_outputs").join("dry_run_cache.jsonl")
    }

    pub fn records(&self) -> PathBuf {
        self.root.join("model_outputs").join("raw_outputs.jsonl")
    }

    pub fn metadata(&self) -> PathBuf {
        self.root.join("metadata.json")
    }

    pub fn summary(&self) -> PathBuf {
        self.root.join("evaluations").join("summary.json")
    }

    pub fn accuracy_csv(&self) -> PathBuf {
        self.root.join("evaluations").join("accuracy_summary.csv")
    }

    pub fn diff_csv(&self) -> PathBuf {
        self.root.join("evaluations").join("diff_bootstrap_ci.csv")
    }

    pub fn data_summary(&self) -> PathBuf {
        self.root.join("data_summary.json")
    }

    pub fn dataset_samples(&self, kind: DatasetKind) -> PathBuf {
        self.root.join(format!("{kind}_samples.json"))
    }
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Truncates and rewrites the record log, one JSON object per line.
pub fn write_records(path: &Path, records: &[ConditionRecord]) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let mut out = BufWriter::new(fs::File::create(path)?);
    for rec in records {
        serde_json::to_writer(&mut out, rec)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Blank lines are skipped; any other unparsable line is an error.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<ConditionRecord>> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let rec = serde_json::from_str(line)
            .map_err(|e| anyhow::anyhow!("{}:{}: invalid record: {}", path.display(), i + 1, e))?;
        records.push(rec);
    }
    Ok(records)
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}
