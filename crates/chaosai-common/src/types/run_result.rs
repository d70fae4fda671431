//! Per-trial record

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::fitness::FitnessResult;
use super::health::HealthCheckResult;
use crate::scenario::BaseScenario;

/// Everything recorded about one trial
#[derive(Debug, Clone, Serialize)]
pub struct CommandRunResult {
    /// Generation the scenario was evaluated in
    pub generation_id: usize,
    /// Monotonic trial id
    pub scenario_id: u64,
    pub scenario: BaseScenario,
    /// Executor command line
    pub cmd: String,
    /// Combined stdout/stderr, or the path of the externalized log
    pub log: String,
    /// Executor exit status
    pub returncode: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub fitness_result: FitnessResult,
    /// Samples per application, in poll order
    pub health_check_results: BTreeMap<String, Vec<HealthCheckResult>>,
}

impl CommandRunResult {
    pub fn fitness_score(&self) -> f64 {
        self.fitness_result.fitness_score
    }

    /// Trial wall-clock duration in seconds
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}
