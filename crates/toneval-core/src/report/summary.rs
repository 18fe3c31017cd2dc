use crate::config::ConditionSpec;
use crate::dataset::DatasetKind;
use crate::engine::record::ConditionRecord;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Fraction of true flags; 0.0 for an empty set.
pub fn compute_accuracy<I: IntoIterator<Item = bool>>(flags: I) -> f64 {
    let (mut n, mut hits) = (0usize, 0usize);
    for flag in flags {
        n += 1;
        if flag {
            hits += 1;
        }
    }
    if n == 0 {
        0.0
    } else {
        hits as f64 / n as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub n: usize,
    pub accuracy: f64,
    pub failed: usize,
}

/// `"<dataset>:<condition>"` → entry, serialized in run order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub entries: Vec<(String, SummaryEntry)>,
}

impl Serialize for RunSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl RunSummary {
    /// Groups in the order of `datasets` × `conditions`; empty groups are skipped.
    pub fn build(records: &[ConditionRecord], datasets: &[DatasetKind], conditions: &[String]) -> Self {
        let mut entries = Vec::new();
        for dataset in datasets {
            for condition in conditions {
                let subset: Vec<&ConditionRecord> = records
                    .iter()
                    .filter(|r| r.dataset == *dataset && &r.condition == condition)
                    .collect();
                if subset.is_empty() {
                    continue;
                }
                entries.push((
                    format!("{dataset}:{condition}"),
                    SummaryEntry {
                        n: subset.len(),
                        accuracy: compute_accuracy(subset.iter().map(|r| r.correct)),
                        failed: subset.iter().filter(|r| r.is_failed()).count(),
                    },
                ));
            }
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&SummaryEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }
}

/// Parameters of one run, written next to the outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub timestamp: String,
    pub model: String,
    pub seed: u64,
    pub gsm8k_n: usize,
    pub arc_n: usize,
    pub max_tokens: u32,
    pub parallel: usize,
    pub provider: String,
    pub conditions: Vec<ConditionSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Example;
    use crate::errors::ErrorKind;
    use crate::pipeline::PipelineOutput;

    fn rec(dataset: DatasetKind, condition: &str, index: usize, prediction: &str) -> ConditionRecord {
        let ex = Example {
            question: "q".into(),
            choices: None,
            gold: "1".into(),
        };
        let out = PipelineOutput {
            prediction: prediction.into(),
            ..Default::default()
        };
        ConditionRecord::completed(dataset, condition, index, &ex, out)
    }

    #[test]
    fn accuracy_of_empty_set_is_zero() {
        assert_eq!(compute_accuracy(Vec::<bool>::new()), 0.0);
        assert_eq!(compute_accuracy([true, false, true, true]), 0.75);
    }

    #[test]
    fn summary_keeps_run_order_and_counts_failures() {
        let ex = Example {
            question: "q".into(),
            choices: None,
            gold: "1".into(),
        };
        let records = vec![
            rec(DatasetKind::Gsm8k, "z-cond", 0, "1"),
            rec(DatasetKind::Gsm8k, "z-cond", 1, "2"),
            rec(DatasetKind::Gsm8k, "a-cond", 0, "1"),
            ConditionRecord::failed(DatasetKind::Gsm8k, "a-cond", 1, &ex, ErrorKind::Network, "down".into()),
        ];
        let summary = RunSummary::build(
            &records,
            &[DatasetKind::Gsm8k, DatasetKind::Arc],
            &["z-cond".to_string(), "a-cond".to_string()],
        );

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.find("gsm8k:z-cond").unwrap() < json.find("gsm8k:a-cond").unwrap());
        assert!(!json.contains("arc:"));
        let a = summary.get("gsm8k:a-cond").unwrap();
        assert_eq!((a.n, a.failed), (2, 1));
        assert_eq!(a.accuracy, 0.5);
        assert_eq!(summary.get("gsm8k:z-cond").unwrap().accuracy, 0.5);
    }
}
