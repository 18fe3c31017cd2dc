//! Condition pipelines: the prompting strategies an experiment compares.
//!
//! Every strategy issues its requests strictly in sequence through the
//! caching client, so re-running a pipeline replays from the cache.

pub mod prompt;
pub mod vote;

pub use prompt::{Severity, Tone};

use crate::client::LlmClient;
use crate::dataset::{DatasetKind, Example};
use crate::errors::LlmError;
use crate::model::{LlmResult, Usage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SELF_CONSISTENCY_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_SAMPLES: u32 = 3;
pub const DEFAULT_ROUNDS: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    Direct,
    ChainOfThought,
    Decompose,
    CritiqueRevise { severity: Severity, rounds: u32 },
    SelfConsistency { samples: u32 },
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ChainOfThought => "cot",
            Self::Decompose => "least_to_most",
            Self::CritiqueRevise { .. } => "critic",
            Self::SelfConsistency { .. } => "self_consistency",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Answer,
    Decompose,
    Solve,
    Critique,
    Revise,
    Sample,
}

/// One request issued by a pipeline, in issue order.
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique within one pipeline run (`answer`, `critique_1`, `sample_2`, ...).
    pub label: String,
    pub kind: StepKind,
    pub result: LlmResult,
}

pub struct PipelineInputs<'a> {
    pub model: &'a str,
    pub tone: Tone,
    pub dataset: DatasetKind,
    pub example: &'a Example,
    pub max_tokens: u32,
    /// Used by the direct and chain-of-thought steps.
    pub temperature: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub steps: Vec<Step>,
    pub response: String,
    pub prediction: String,
    pub subquestions: Option<String>,
    pub critique: Option<String>,
    pub responses: Option<Vec<String>>,
}

impl PipelineOutput {
    /// True when no step reached the network.
    pub fn cached(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.result.cached)
    }

    pub fn usage(&self) -> BTreeMap<String, Usage> {
        self.steps
            .iter()
            .map(|s| (s.label.clone(), s.result.usage.clone()))
            .collect()
    }

    fn push(&mut self, label: impl Into<String>, kind: StepKind, result: LlmResult) -> String {
        let text = result.response_text.clone();
        self.steps.push(Step {
            label: label.into(),
            kind,
            result,
        });
        text
    }
}

impl Strategy {
    pub async fn run(
        &self,
        client: &LlmClient,
        inputs: &PipelineInputs<'_>,
    ) -> Result<PipelineOutput, LlmError> {
        let system = inputs.tone.system_prompt();
        let kind = inputs.dataset;
        let example = inputs.example;
        let ask = |user: String, temperature: f64| async move {
            client
                .generate(inputs.model, system, &user, temperature, inputs.max_tokens)
                .await
        };

        let mut out = PipelineOutput::default();
        match self {
            Self::Direct => {
                let res = ask(prompt::direct(kind, example), inputs.temperature).await?;
                out.response = out.push("answer", StepKind::Answer, res);
                out.prediction = kind.extract_answer(&out.response);
            }
            Self::ChainOfThought => {
                let res = ask(prompt::chain_of_thought(kind, example), inputs.temperature).await?;
                out.response = out.push("answer", StepKind::Answer, res);
                out.prediction = kind.extract_answer(&out.response);
            }
            Self::Decompose => {
                let subq = ask(prompt::decompose(kind, example), 0.0).await?;
                let subquestions = out.push("subq", StepKind::Decompose, subq);
                let solve = ask(
                    prompt::solve_from_subquestions(kind, example, &subquestions),
                    0.0,
                )
                .await?;
                out.response = out.push("final", StepKind::Solve, solve);
                out.prediction = kind.extract_answer(&out.response);
                out.subquestions = Some(subquestions);
            }
            Self::CritiqueRevise { severity, rounds } => {
                let first = ask(prompt::chain_of_thought(kind, example), 0.0).await?;
                let mut current = out.push("answer", StepKind::Answer, first);
                for round in 1..=*rounds {
                    let crit = ask(prompt::critique(&current, *severity), 0.0).await?;
                    let critique = out.push(format!("critique_{round}"), StepKind::Critique, crit);
                    let revised = ask(prompt::revise(kind, example, &critique), 0.0).await?;
                    current = out.push(format!("revision_{round}"), StepKind::Revise, revised);
                    out.critique = Some(critique);
                }
                out.prediction = kind.extract_answer(&current);
                out.response = current;
            }
            Self::SelfConsistency { samples } => {
                let user = prompt::chain_of_thought(kind, example);
                let mut responses = Vec::new();
                for i in 1..=*samples {
                    let res = ask(user.clone(), SELF_CONSISTENCY_TEMPERATURE).await?;
                    responses.push(out.push(format!("sample_{i}"), StepKind::Sample, res));
                }
                let answers: Vec<String> =
                    responses.iter().map(|r| kind.extract_answer(r)).collect();
                let voted = vote::majority_vote(&answers);
                let pick = answers
                    .iter()
                    .position(|a| !voted.is_empty() && *a == voted)
                    .unwrap_or(0);
                out.response = responses.get(pick).cloned().unwrap_or_default();
                out.prediction = voted;
                out.responses = Some(responses);
            }
        }
        Ok(out)
    }
}
