use crate::dataset::{Choices, DatasetKind, Example};
use crate::errors::{ErrorKind, LlmError};
use crate::model::Usage;
use crate::pipeline::{PipelineOutput, StepKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub label: String,
    pub kind: StepKind,
    pub request_id: String,
    pub cached: bool,
}

/// Outcome of one (dataset, condition, example) triple; one line of the record log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub dataset: DatasetKind,
    pub condition: String,
    pub index: usize,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Choices>,
    pub gold: String,
    #[serde(default)]
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subquestions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critique: Option<String>,
    #[serde(default)]
    pub prediction: String,
    pub correct: bool,
    #[serde(default)]
    pub usage: BTreeMap<String, Usage>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RecordError>,
}

impl ConditionRecord {
    fn base(dataset: DatasetKind, condition: &str, index: usize, example: &Example) -> Self {
        Self {
            dataset,
            condition: condition.to_string(),
            index,
            question: example.question.clone(),
            choices: example.choices.clone(),
            gold: example.gold.clone(),
            response: String::new(),
            responses: None,
            subquestions: None,
            critique: None,
            prediction: String::new(),
            correct: false,
            usage: BTreeMap::new(),
            cached: false,
            steps: Vec::new(),
            status: RecordStatus::Ok,
            error: None,
        }
    }

    pub fn completed(
        dataset: DatasetKind,
        condition: &str,
        index: usize,
        example: &Example,
        output: PipelineOutput,
    ) -> Self {
        let mut rec = Self::base(dataset, condition, index, example);
        rec.correct = dataset.is_correct(&output.prediction, &example.gold);
        rec.usage = output.usage();
        rec.cached = output.cached();
        rec.steps = output
            .steps
            .iter()
            .map(|s| StepRecord {
                label: s.label.clone(),
                kind: s.kind,
                request_id: s.result.request_id.clone(),
                cached: s.result.cached,
            })
            .collect();
        rec.response = output.response;
        rec.responses = output.responses;
        rec.subquestions = output.subquestions;
        rec.critique = output.critique;
        rec.prediction = output.prediction;
        rec
    }

    /// Scores as incorrect.
    pub fn failed(
        dataset: DatasetKind,
        condition: &str,
        index: usize,
        example: &Example,
        kind: ErrorKind,
        message: String,
    ) -> Self {
        let mut rec = Self::base(dataset, condition, index, example);
        rec.status = RecordStatus::Failed;
        rec.error = Some(RecordError { kind, message });
        rec
    }

    pub fn from_error(
        dataset: DatasetKind,
        condition: &str,
        index: usize,
        example: &Example,
        err: &LlmError,
    ) -> Self {
        Self::failed(dataset, condition, index, example, err.kind(), err.to_string())
    }

    pub fn is_failed(&self) -> bool {
        self.status == RecordStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> Example {
        Example {
            question: "q".into(),
            choices: None,
            gold: "4".into(),
        }
    }

    #[test]
    fn failed_record_serializes_error_kind() {
        let err = LlmError::Server {
            status: 502,
            message: "bad gateway".into(),
        };
        let rec = ConditionRecord::from_error(DatasetKind::Gsm8k, "direct-neutral", 3, &example(), &err);
        assert!(rec.is_failed());
        assert!(!rec.correct);

        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["error"]["kind"], "provider_server");
        assert_eq!(v["dataset"], "gsm8k");
        assert!(v.get("choices").is_none());
        assert!(v.get("critique").is_none());
    }

    #[test]
    fn minimal_legacy_lines_deserialize() {
        let line = r#"{"dataset": "arc", "condition": "cot-neutral", "index": 0, "question": "q",
            "gold": "B", "response": "Final: B", "prediction": "B", "correct": true,
            "usage": {}, "cached": false, "status": "ok"}"#;
        let rec: ConditionRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.dataset, DatasetKind::Arc);
        assert!(rec.correct);
        assert!(rec.steps.is_empty());
    }
}
