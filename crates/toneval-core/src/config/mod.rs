//! Experiment conditions: built-in defaults or a YAML file.

use crate::pipeline::{Severity, Strategy, Tone, DEFAULT_ROUNDS, DEFAULT_SAMPLES};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read conditions file {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid conditions file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("duplicate condition name: {0}")]
    DuplicateName(String),

    #[error("condition {name}: {message}")]
    Invalid { name: String, message: String },

    #[error("no conditions configured")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Direct,
    Cot,
    #[serde(alias = "decompose")]
    LeastToMost,
    Critic,
    SelfConsistency,
}

/// One condition as written in the conditions file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionSpec {
    pub name: String,
    #[serde(default)]
    pub tone: Tone,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConditionsFile {
    conditions: Vec<ConditionSpec>,
}

/// A validated condition ready for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub name: String,
    pub tone: Tone,
    pub strategy: Strategy,
    pub max_tokens: Option<u32>,
    pub temperature: f64,
    pub spec: ConditionSpec,
}

impl ConditionSpec {
    fn new(name: &str, tone: Tone, method: Method) -> Self {
        Self {
            name: name.to_string(),
            tone,
            method,
            severity: None,
            rounds: None,
            samples: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn resolve(&self) -> Result<Condition, ConfigError> {
        let invalid = |message: &str| ConfigError::Invalid {
            name: self.name.clone(),
            message: message.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.max_tokens == Some(0) {
            return Err(invalid("max_tokens must be positive"));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(invalid("temperature must be within 0.0..=2.0"));
            }
        }

        let uses_temperature = matches!(self.method, Method::Direct | Method::Cot);
        if self.temperature.is_some() && !uses_temperature {
            return Err(invalid("temperature applies only to direct and cot"));
        }
        if self.method != Method::Critic && (self.severity.is_some() || self.rounds.is_some()) {
            return Err(invalid("severity and rounds apply only to critic"));
        }
        if self.method != Method::SelfConsistency && self.samples.is_some() {
            return Err(invalid("samples applies only to self_consistency"));
        }

        let strategy = match self.method {
            Method::Direct => Strategy::Direct,
            Method::Cot => Strategy::ChainOfThought,
            Method::LeastToMost => Strategy::Decompose,
            Method::Critic => {
                let rounds = self.rounds.unwrap_or(DEFAULT_ROUNDS);
                if rounds == 0 {
                    return Err(invalid("rounds must be at least 1"));
                }
                Strategy::CritiqueRevise {
                    severity: self.severity.unwrap_or_default(),
                    rounds,
                }
            }
            Method::SelfConsistency => {
                let samples = self.samples.unwrap_or(DEFAULT_SAMPLES);
                if samples == 0 {
                    return Err(invalid("samples must be at least 1"));
                }
                Strategy::SelfConsistency { samples }
            }
        };

        Ok(Condition {
            name: self.name.clone(),
            tone: self.tone,
            strategy,
            max_tokens: self.max_tokens,
            temperature: self.temperature.unwrap_or(0.0),
            spec: self.clone(),
        })
    }
}

impl Condition {
    pub fn max_tokens_or(&self, default: u32) -> u32 {
        self.max_tokens.unwrap_or(default)
    }
}

pub fn default_condition_specs() -> Vec<ConditionSpec> {
    let critic = |name: &str, max_tokens: Option<u32>| ConditionSpec {
        severity: Some(Severity::Harsh),
        rounds: Some(1),
        max_tokens,
        ..ConditionSpec::new(name, Tone::Neutral, Method::Critic)
    };
    vec![
        ConditionSpec::new("direct-neutral", Tone::Neutral, Method::Direct),
        ConditionSpec::new("cot-neutral", Tone::Neutral, Method::Cot),
        critic("critic-harsh", None),
        critic("critic-harsh-lowbudget", Some(128)),
        ConditionSpec::new("rude-direct", Tone::Rude, Method::Direct),
        ConditionSpec::new("polite-direct", Tone::Polite, Method::Direct),
    ]
}

pub fn default_conditions() -> Vec<Condition> {
    // Built-in specs are statically valid.
    default_condition_specs()
        .iter()
        .filter_map(|s| s.resolve().ok())
        .collect()
}

pub fn resolve_all(specs: &[ConditionSpec]) -> Result<Vec<Condition>, ConfigError> {
    if specs.is_empty() {
        return Err(ConfigError::Empty);
    }
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(ConfigError::DuplicateName(spec.name.clone()));
        }
        out.push(spec.resolve()?);
    }
    Ok(out)
}

pub fn parse_conditions(yaml: &str, origin: &str) -> Result<Vec<Condition>, ConfigError> {
    let file: ConditionsFile = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;
    resolve_all(&file.conditions)
}

pub fn load_conditions(path: &Path) -> Result<Vec<Condition>, ConfigError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: display.clone(),
        message: e.to_string(),
    })?;
    parse_conditions(&raw, &display)
}
