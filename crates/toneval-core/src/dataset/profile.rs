//! Shape of a raw dataset split: row count, columns, missing values and a
//! few sample rows, read without the typed loaders' schema.

use super::{read_rows, resolve_split, DatasetError, DatasetKind};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordStats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub source: String,
    pub rows: usize,
    pub columns: Vec<String>,
    /// Per column: rows where the key is absent or `null`.
    pub missing_values: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_words: Option<WordStats>,
    #[serde(skip)]
    pub samples: Vec<Value>,
}

/// `data_summary.json`: one profile per dataset, GSM8K first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub gsm8k: DatasetProfile,
    pub arc: DatasetProfile,
}

impl DataSummary {
    pub fn get(&self, kind: DatasetKind) -> &DatasetProfile {
        match kind {
            DatasetKind::Gsm8k => &self.gsm8k,
            DatasetKind::Arc => &self.arc,
        }
    }
}

pub fn profile_split(path: &Path, n_samples: usize) -> Result<DatasetProfile, DatasetError> {
    let source = resolve_split(path)?.display().to_string();
    let rows: Vec<Value> = read_rows(path)?;

    let columns: BTreeSet<String> = rows
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|obj| obj.keys().cloned())
        .collect();
    let missing_values = columns
        .iter()
        .map(|col| {
            let n = rows
                .iter()
                .filter(|row| row.get(col).filter(|v| !v.is_null()).is_none())
                .count();
            (col.clone(), n)
        })
        .collect();

    let lengths: Vec<usize> = rows
        .iter()
        .filter_map(|row| row.get("question").and_then(Value::as_str))
        .map(|q| q.split_whitespace().count())
        .collect();
    let question_words = match (lengths.iter().min(), lengths.iter().max()) {
        (Some(&min), Some(&max)) => Some(WordStats {
            min,
            max,
            mean: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
        }),
        _ => None,
    };

    Ok(DatasetProfile {
        source,
        rows: rows.len(),
        columns: columns.into_iter().collect(),
        missing_values,
        question_words,
        samples: rows.into_iter().take(n_samples).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn counts_rows_columns_and_gaps() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("test.jsonl"),
            concat!(
                "{\"question\": \"one two three\", \"answer\": \"#### 1\"}\n",
                "\n",
                "{\"question\": \"four five\", \"answer\": null}\n",
                "{\"question\": \"six\", \"answer\": \"#### 3\", \"note\": \"x\"}\n",
            ),
        )
        .unwrap();

        let p = profile_split(dir.path(), 2).unwrap();
        assert_eq!(p.rows, 3);
        assert_eq!(p.columns, vec!["answer", "note", "question"]);
        assert_eq!(p.missing_values["answer"], 1);
        assert_eq!(p.missing_values["note"], 2);
        assert_eq!(p.missing_values["question"], 0);
        assert_eq!(
            p.question_words,
            Some(WordStats {
                min: 1,
                max: 3,
                mean: 2.0
            })
        );
        assert_eq!(p.samples.len(), 2);
        assert_eq!(p.samples[1]["question"], "four five");
        assert!(p.source.ends_with("test.jsonl"));
    }

    #[test]
    fn missing_split_is_not_found() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            profile_split(&dir.path().join("nope"), 3),
            Err(DatasetError::NotFound { .. })
        ));
    }

    #[test]
    fn rows_without_questions_have_no_word_stats() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("rows.jsonl");
        fs::write(&file, "{\"a\": 1}\n").unwrap();
        let p = profile_split(&file, 3).unwrap();
        assert_eq!(p.rows, 1);
        assert!(p.question_words.is_none());
        assert!(!serde_json::to_string(&p).unwrap().contains("samples"));
    }
}
