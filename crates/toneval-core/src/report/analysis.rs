//! Accuracy tables and paired-bootstrap comparisons against the baseline condition.

use super::bootstrap::{mean_diff, paired_bootstrap_diff, DEFAULT_ALPHA, DEFAULT_RESAMPLES, DEFAULT_SEED};
use super::summary::compute_accuracy;
use crate::engine::record::ConditionRecord;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

pub const BASELINE_CONDITION: &str = "direct-neutral";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyRow {
    pub dataset: String,
    pub condition: String,
    pub n: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRow {
    pub dataset: String,
    pub condition: String,
    pub diff_vs_direct: f64,
    pub ci_low: Option<f64>,
    pub ci_high: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub baseline: String,
    pub resamples: usize,
    pub seed: u64,
    pub alpha: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            baseline: BASELINE_CONDITION.to_string(),
            resamples: DEFAULT_RESAMPLES,
            seed: DEFAULT_SEED,
            alpha: DEFAULT_ALPHA,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub accuracy: Vec<AccuracyRow>,
    pub diffs: Vec<DiffRow>,
}

/// Correctness flags sorted by example index.
fn scores(records: &[&ConditionRecord]) -> Vec<f64> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.index);
    sorted
        .iter()
        .map(|r| if r.correct { 1.0 } else { 0.0 })
        .collect()
}

/// Datasets and conditions are visited in lexicographic order. Datasets
/// without a baseline get accuracy rows but no comparisons.
pub fn analyze(records: &[ConditionRecord], opts: &AnalysisOptions) -> Analysis {
    let datasets: BTreeSet<String> = records.iter().map(|r| r.dataset.to_string()).collect();
    let mut out = Analysis::default();

    for dataset in &datasets {
        let in_dataset: Vec<&ConditionRecord> = records
            .iter()
            .filter(|r| r.dataset.as_str() == dataset.as_str())
            .collect();
        let of = |condition: &str| {
            in_dataset
                .iter()
                .copied()
                .filter(|r| r.condition == condition)
                .collect::<Vec<_>>()
        };
        let baseline = of(&opts.baseline);
        let base_scores = scores(&baseline);

        let conditions: BTreeSet<&str> = in_dataset.iter().map(|r| r.condition.as_str()).collect();
        for condition in conditions {
            let subset = of(condition);
            out.accuracy.push(AccuracyRow {
                dataset: dataset.clone(),
                condition: condition.to_string(),
                n: subset.len(),
                accuracy: compute_accuracy(subset.iter().map(|r| r.correct)),
            });

            if condition == opts.baseline || baseline.is_empty() {
                continue;
            }
            let other_scores = scores(&subset);
            let n = base_scores.len().min(other_scores.len());
            let (base, other) = (&base_scores[..n], &other_scores[..n]);
            let ci = paired_bootstrap_diff(base, other, opts.resamples, opts.seed, opts.alpha);
            out.diffs.push(DiffRow {
                dataset: dataset.clone(),
                condition: condition.to_string(),
                diff_vs_direct: mean_diff(base, other),
                ci_low: ci.map(|c| c.0),
                ci_high: ci.map(|c| c.1),
            });
        }
    }
    out
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T], headers: &[&str]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        wtr.write_record(headers)?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

impl Analysis {
    pub fn write_accuracy_csv(&self, path: &Path) -> anyhow::Result<()> {
        write_rows(path, &self.accuracy, &["dataset", "condition", "n", "accuracy"])
    }

    pub fn write_diff_csv(&self, path: &Path) -> anyhow::Result<()> {
        write_rows(
            path,
            &self.diffs,
            &["dataset", "condition", "diff_vs_direct", "ci_low", "ci_high"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetKind, Example};
    use crate::pipeline::PipelineOutput;

    fn rec(dataset: DatasetKind, condition: &str, index: usize, correct: bool) -> ConditionRecord {
        let ex = Example {
            question: format!("q{index}"),
            choices: None,
            gold: "1".into(),
        };
        let out = PipelineOutput {
            prediction: if correct { "1".into() } else { "0".into() },
            ..Default::default()
        };
        ConditionRecord::completed(dataset, condition, index, &ex, out)
    }

    fn sample() -> Vec<ConditionRecord> {
        let mut v = Vec::new();
        for i in 0..6 {
            v.push(rec(DatasetKind::Gsm8k, "direct-neutral", i, i % 2 == 0));
            v.push(rec(DatasetKind::Gsm8k, "cot-neutral", i, true));
        }
        // shorter arm is trimmed against the baseline
        for i in (0..3).rev() {
            v.push(rec(DatasetKind::Gsm8k, "rude-direct", i, false));
        }
        v.push(rec(DatasetKind::Arc, "cot-neutral", 0, true));
        v
    }

    #[test]
    fn accuracy_rows_are_sorted_and_complete() {
        let a = analyze(&sample(), &AnalysisOptions::default());
        let keys: Vec<(&str, &str)> = a
            .accuracy
            .iter()
            .map(|r| (r.dataset.as_str(), r.condition.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("arc", "cot-neutral"),
                ("gsm8k", "cot-neutral"),
                ("gsm8k", "direct-neutral"),
                ("gsm8k", "rude-direct"),
            ]
        );
        assert_eq!(a.accuracy[2].accuracy, 0.5);
        assert_eq!(a.accuracy[3].n, 3);
    }

    #[test]
    fn diffs_against_baseline_with_trimming() {
        let a = analyze(&sample(), &AnalysisOptions::default());
        assert_eq!(a.diffs.len(), 2);
        let cot = &a.diffs[0];
        assert_eq!(cot.condition, "cot-neutral");
        assert!((cot.diff_vs_direct - 0.5).abs() < 1e-12);
        assert!(cot.ci_low.unwrap() <= 0.5 && 0.5 <= cot.ci_high.unwrap());

        // baseline indices 0..3 are [1, 0, 1]
        let rude = &a.diffs[1];
        assert!((rude.diff_vs_direct + 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn csv_outputs_have_headers() {
        let dir = tempfile::tempdir().unwrap();
        let a = analyze(&sample(), &AnalysisOptions::default());
        let acc = dir.path().join("evaluations/accuracy_summary.csv");
        let diff = dir.path().join("evaluations/diff_bootstrap_ci.csv");
        a.write_accuracy_csv(&acc).unwrap();
        a.write_diff_csv(&diff).unwrap();

        let acc_text = std::fs::read_to_string(acc).unwrap();
        assert!(acc_text.starts_with("dataset,condition,n,accuracy\n"));
        assert_eq!(acc_text.lines().count(), 5);
        let diff_text = std::fs::read_to_string(diff).unwrap();
        assert!(diff_text.starts_with("dataset,condition,diff_vs_direct,ci_low,ci_high\n"));

        let empty = Analysis::default();
        let path = dir.path().join("empty.csv");
        empty.write_diff_csv(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap().trim(),
            "dataset,condition,diff_vs_direct,ci_low,ci_high"
        );
    }
}
