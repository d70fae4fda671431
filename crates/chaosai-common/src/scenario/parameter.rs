//! Scenario parameters
//!
//! A parameter is a named value plus the law that mutates it. Every law keeps
//! the value inside the parameter's declared domain.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::ScenarioError;

/// Typed scalar held by a parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(i64::from(value))
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

/// How a parameter changes when it is mutated
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPolicy {
    /// Uniform draw from the candidate set
    Choice(Vec<String>),
    /// Uniform integer draw from `[min, max]`
    UniformInt { min: i64, max: i64 },
    /// ±(1..=max_percent)% of the current value, direction by coin flip,
    /// clamped to `[min, max]`
    Perturb { max_percent: u32, min: i64, max: i64 },
    /// Mutation is a no-op
    Fixed,
}

/// A named, typed, mutable scenario parameter
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    /// Environment-style name, e.g. `NAMESPACE`
    pub name: String,
    /// Current value
    pub value: ParameterValue,
    #[serde(skip)]
    policy: MutationPolicy,
    /// Unit appended when the value is rendered for the executor
    #[serde(skip)]
    suffix: Option<&'static str>,
}

impl Parameter {
    /// Choice parameter whose initial value is sampled from `candidates`
    pub fn sampled<R: Rng + ?Sized>(
        name: &str,
        candidates: &[String],
        rng: &mut R,
    ) -> Result<Self, ScenarioError> {
        let value = candidates
            .choose(rng)
            .ok_or_else(|| ScenarioError::EmptyCandidates {
                parameter: name.to_string(),
            })?
            .clone();

        Ok(Self {
            name: name.to_string(),
            value: ParameterValue::Text(value),
            policy: MutationPolicy::Choice(candidates.to_vec()),
            suffix: None,
        })
    }

    /// Choice parameter with a fixed starting value
    pub fn choice(name: &str, default: &str, candidates: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            value: ParameterValue::from(default),
            policy: MutationPolicy::Choice(candidates.iter().map(|c| c.to_string()).collect()),
            suffix: None,
        }
    }

    /// Integer parameter redrawn uniformly from `[min, max]`
    pub fn uniform_int(name: &str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            value: ParameterValue::Int(default.clamp(min, max)),
            policy: MutationPolicy::UniformInt { min, max },
            suffix: None,
        }
    }

    /// Integer parameter perturbed relative to its current value
    pub fn perturbed(name: &str, default: i64, max_percent: u32, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            value: ParameterValue::Int(default.clamp(min, max)),
            policy: MutationPolicy::Perturb {
                max_percent: max_percent.max(1),
                min,
                max,
            },
            suffix: None,
        }
    }

    /// Parameter that never mutates
    pub fn fixed(name: &str, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            policy: MutationPolicy::Fixed,
            suffix: None,
        }
    }

    /// Append a unit when rendering, e.g. `90%`
    pub fn with_suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn policy(&self) -> &MutationPolicy {
        &self.policy
    }

    /// Value as handed to the chaos executor
    pub fn rendered(&self) -> String {
        match self.suffix {
            Some(suffix) => format!("{}{}", self.value, suffix),
            None => self.value.to_string(),
        }
    }

    /// Whether the current value lies in the declared domain
    pub fn in_domain(&self) -> bool {
        match (&self.policy, &self.value) {
            (MutationPolicy::Choice(candidates), ParameterValue::Text(v)) => {
                candidates.iter().any(|c| c == v)
            }
            (MutationPolicy::UniformInt { min, max }, ParameterValue::Int(v))
            | (MutationPolicy::Perturb { min, max, .. }, ParameterValue::Int(v)) => {
                (*min..=*max).contains(v)
            }
            (MutationPolicy::Fixed, _) => true,
            _ => false,
        }
    }

    /// Apply this parameter's mutation law in place
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match &self.policy {
            MutationPolicy::Choice(candidates) => {
                if let Some(next) = candidates.choose(rng) {
                    self.value = ParameterValue::Text(next.clone());
                }
            }
            MutationPolicy::UniformInt { min, max } => {
                self.value = ParameterValue::Int(rng.gen_range(*min..=*max));
            }
            MutationPolicy::Perturb {
                max_percent,
                min,
                max,
            } => {
                if let ParameterValue::Int(current) = self.value {
                    let delta =
                        f64::from(rng.gen_range(1..=*max_percent)) * current as f64 / 100.0;
                    let next = if rng.gen_bool(0.5) {
                        current as f64 + delta
                    } else {
                        current as f64 - delta
                    };
                    self.value = ParameterValue::Int((next.round() as i64).clamp(*min, *max));
                }
            }
            MutationPolicy::Fixed => {}
        }
    }
}
