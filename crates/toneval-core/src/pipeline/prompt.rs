//! Prompt texts for each dataset and strategy step.

use crate::dataset::{DatasetKind, Example};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Neutral,
    Polite,
    Rude,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Polite => "polite",
            Self::Rude => "rude",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::Neutral => "You are a helpful assistant.",
            Self::Polite => "You are courteous and helpful. Be respectful and professional.",
            Self::Rude => "You are terse and impatient. Answer with no unnecessary niceties.",
        }
    }
}

/// How hard the critique step pushes on the current answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Harsh,
    Constructive,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Harsh => "harsh",
            Self::Constructive => "constructive",
        }
    }
}

/// `Question: ...\nChoices:\nA. ...` for multiple-choice examples.
fn arc_block(example: &Example) -> String {
    let choices = example
        .choices
        .as_ref()
        .map(|c| c.render())
        .unwrap_or_default();
    format!("Question: {}\nChoices:\n{}", example.question, choices)
}

pub fn direct(kind: DatasetKind, example: &Example) -> String {
    match kind {
        DatasetKind::Gsm8k => format!(
            "Solve the problem and give only the final numeric answer. \
             Format: Final: <number>\n\nProblem: {}",
            example.question
        ),
        DatasetKind::Arc => format!(
            "Choose the correct option. Provide only the letter. \
             Format: Final: <letter>\n\n{}",
            arc_block(example)
        ),
    }
}

pub fn chain_of_thought(kind: DatasetKind, example: &Example) -> String {
    match kind {
        DatasetKind::Gsm8k => format!(
            "Solve the problem step by step. End with 'Final: <number>'.\n\nProblem: {}",
            example.question
        ),
        DatasetKind::Arc => format!(
            "Reason step by step, then give the final answer letter. \
             End with 'Final: <letter>'.\n\n{}",
            arc_block(example)
        ),
    }
}

pub fn decompose(kind: DatasetKind, example: &Example) -> String {
    match kind {
        DatasetKind::Gsm8k => format!(
            "Break the problem into 2-4 sub-questions that would help solve it. \
             List them as Q1:, Q2:, etc.\n\nProblem: {}",
            example.question
        ),
        DatasetKind::Arc => format!(
            "Break the question into 2-4 sub-questions that would help decide the correct option. \
             List them as Q1:, Q2:, etc.\n\n{}",
            arc_block(example)
        ),
    }
}

/// Embeds the decompose response verbatim.
pub fn solve_from_subquestions(kind: DatasetKind, example: &Example, subquestions: &str) -> String {
    match kind {
        DatasetKind::Gsm8k => format!(
            "Use the sub-questions to solve the original problem step by step. \
             End with 'Final: <number>'.\n\nProblem: {}\n\nSub-questions:\n{}",
            example.question, subquestions
        ),
        DatasetKind::Arc => format!(
            "Use the sub-questions to solve the original question step by step. \
             End with 'Final: <letter>'.\n\n{}\n\nSub-questions:\n{}",
            arc_block(example),
            subquestions
        ),
    }
}

pub fn critique(answer: &str, severity: Severity) -> String {
    let tone = match severity {
        Severity::Harsh => "Be extremely critical and point out every flaw or missing step.",
        Severity::Constructive => "Be constructive and point out issues or gaps.",
    };
    format!("Critique the answer below. {tone} Provide a short list of issues.\n\nAnswer:\n{answer}")
}

/// The question shown to the reviser includes the options for multiple choice.
pub fn revise(kind: DatasetKind, example: &Example, critique: &str) -> String {
    let (instruction, question) = match kind {
        DatasetKind::Gsm8k => (
            "Revise the solution using the critique and provide the final numeric answer. \
             End with 'Final: <number>'.",
            example.question.clone(),
        ),
        DatasetKind::Arc => (
            "Revise the answer using the critique and provide the final letter. \
             End with 'Final: <letter>'.",
            arc_block(example),
        ),
    };
    format!("{instruction}\n\nQuestion:\n{question}\n\nCritique:\n{critique}")
}
