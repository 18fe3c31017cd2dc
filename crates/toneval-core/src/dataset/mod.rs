//! Benchmark corpora (GSM8K, ARC) stored as JSONL on disk.

pub mod extract;
pub mod profile;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset not found: {path}")]
    NotFound { path: String },

    #[error("failed to read dataset {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid row in {path} at line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Gsm8k,
    Arc,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gsm8k => "gsm8k",
            Self::Arc => "arc",
        }
    }

    pub fn extract_answer(&self, text: &str) -> String {
        match self {
            Self::Gsm8k => extract::extract_gsm8k_final(text),
            Self::Arc => extract::extract_arc_final(text),
        }
    }

    pub fn is_correct(&self, prediction: &str, gold: &str) -> bool {
        match self {
            Self::Gsm8k => extract::is_correct_gsm8k(prediction, gold),
            Self::Arc => extract::is_correct_arc(prediction, gold),
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multiple-choice options, parallel label/text lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choices {
    pub label: Vec<String>,
    pub text: Vec<String>,
}

impl Choices {
    /// `A. first\nB. second`
    pub fn render(&self) -> String {
        self.label
            .iter()
            .zip(&self.text)
            .map(|(label, text)| format!("{label}. {text}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub question: String,
    pub choices: Option<Choices>,
    pub gold: String,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub kind: DatasetKind,
    pub examples: Vec<Example>,
}

#[derive(Deserialize)]
struct Gsm8kRow {
    question: String,
    answer: String,
}

#[derive(Deserialize)]
struct ArcRow {
    question: String,
    choices: Choices,
    #[serde(rename = "answerKey")]
    answer_key: String,
}

/// A directory resolves to its `test.jsonl`; a file is used as is.
pub fn resolve_split(path: &Path) -> Result<PathBuf, DatasetError> {
    let candidate = if path.is_dir() {
        path.join("test.jsonl")
    } else {
        path.to_path_buf()
    };
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(DatasetError::NotFound {
            path: candidate.display().to_string(),
        })
    }
}

pub(crate) fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, DatasetError> {
    let file = resolve_split(path)?;
    let display = file.display().to_string();
    let content = fs::read_to_string(&file).map_err(|e| DatasetError::Io {
        path: display.clone(),
        message: e.to_string(),
    })?;

    let mut rows = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = serde_json::from_str(line).map_err(|e| DatasetError::Parse {
            path: display.clone(),
            line: i + 1,
            message: e.to_string(),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_gsm8k(path: &Path) -> Result<Dataset, DatasetError> {
    let examples = read_rows::<Gsm8kRow>(path)?
        .into_iter()
        .map(|row| Example {
            gold: extract::parse_gsm8k_answer(&row.answer),
            question: row.question,
            choices: None,
        })
        .collect();
    Ok(Dataset {
        kind: DatasetKind::Gsm8k,
        examples,
    })
}

pub fn load_arc(path: &Path) -> Result<Dataset, DatasetError> {
    let examples = read_rows::<ArcRow>(path)?
        .into_iter()
        .map(|row| Example {
            question: row.question,
            choices: Some(row.choices),
            gold: row.answer_key,
        })
        .collect();
    Ok(Dataset {
        kind: DatasetKind::Arc,
        examples,
    })
}

impl Dataset {
    /// Keep everything when `n` covers the split, else a seeded shuffle truncated to `n`.
    pub fn sample(mut self, n: usize, seed: u64) -> Self {
        if n >= self.examples.len() {
            return self;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        self.examples.shuffle(&mut rng);
        self.examples.truncate(n);
        self
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_gsm(dir: &Path, n: usize) {
        let mut lines = String::new();
        for i in 0..n {
            lines.push_str(&format!(
                "{{\"question\": \"What is {i} + 1?\", \"answer\": \"{i} + 1 = {}\\n#### {}\"}}\n",
                i + 1,
                i + 1
            ));
        }
        fs::write(dir.join("test.jsonl"), lines).unwrap();
    }

    #[test]
    fn loads_gsm8k_from_directory() {
        let dir = tempdir().unwrap();
        write_gsm(dir.path(), 3);
        let ds = load_gsm8k(dir.path()).unwrap();
        assert_eq!(ds.kind, DatasetKind::Gsm8k);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.examples[2].gold, "3");
        assert!(ds.examples[0].choices.is_none());
    }

    #[test]
    fn loads_arc_file_with_choices() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("arc.jsonl");
        fs::write(
            &file,
            r#"{"question": "Which is a gas?", "choices": {"label": ["A", "B"], "text": ["Ice", "Steam"]}, "answerKey": "B"}"#,
        )
        .unwrap();
        let ds = load_arc(&file).unwrap();
        let ex = &ds.examples[0];
        assert_eq!(ex.gold, "B");
        assert_eq!(ex.choices.as_ref().unwrap().render(), "A. Ice\nB. Steam");
    }

    #[test]
    fn missing_split_and_bad_rows_are_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_gsm8k(dir.path()),
            Err(DatasetError::NotFound { .. })
        ));
        fs::write(dir.path().join("test.jsonl"), "{\"question\": 1}\n").unwrap();
        assert!(matches!(
            load_gsm8k(dir.path()),
            Err(DatasetError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn sampling_is_seeded_and_bounded() {
        let dir = tempdir().unwrap();
        write_gsm(dir.path(), 20);
        let a = load_gsm8k(dir.path()).unwrap().sample(5, 42);
        let b = load_gsm8k(dir.path()).unwrap().sample(5, 42);
        assert_eq!(a.len(), 5);
        assert_eq!(a.examples, b.examples);

        let all = load_gsm8k(dir.path()).unwrap().sample(100, 42);
        assert_eq!(all.len(), 20);
        assert_eq!(all.examples[0].question, "What is 0 + 1?");
    }
}
