//! Health check summaries folded into fitness and reports

use std::collections::BTreeMap;

use chaosai_common::HealthCheckResult;
use serde::Serialize;

/// Fraction of failed polls, 0 for no polls
pub fn failure_ratio(results: &[HealthCheckResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let failed = results.iter().filter(|r| !r.success).count();
    failed as f64 / results.len() as f64
}

/// Successful response times above `Q3 + 1.5 * IQR`
///
/// Fewer than four successful samples yield 0.
pub fn response_time_outliers(results: &[HealthCheckResult]) -> usize {
    let mut times: Vec<f64> = results
        .iter()
        .filter(|r| r.success)
        .map(|r| r.response_time)
        .collect();
    if times.len() < 4 {
        return 0;
    }
    times.sort_by(f64::total_cmp);

    let q1 = percentile(&times, 25.0);
    let q3 = percentile(&times, 75.0);
    let upper = q3 + 1.5 * (q3 - q1);
    times.iter().filter(|t| **t > upper).count()
}

/// Linear-interpolated percentile of sorted, non-empty data
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

/// Sum of per-application failure ratios
pub fn summarize_success_rate(results: &BTreeMap<String, Vec<HealthCheckResult>>) -> f64 {
    results.values().map(|r| failure_ratio(r)).sum()
}

/// Sum of per-application response-time outlier counts
pub fn summarize_response_time(results: &BTreeMap<String, Vec<HealthCheckResult>>) -> f64 {
    results
        .values()
        .map(|r| response_time_outliers(r) as f64)
        .sum()
}

/// Per-application row of the health check report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSummary {
    pub scenario_id: u64,
    pub component_name: String,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub average_response_time: f64,
    pub success_count: usize,
    pub failure_count: usize,
}

impl HealthSummary {
    /// `None` when the application was never polled
    pub fn from_results(scenario_id: u64, results: &[HealthCheckResult]) -> Option<Self> {
        let first = results.first()?;
        let times = results.iter().map(|r| r.response_time);
        let success_count = results.iter().filter(|r| r.success).count();

        Some(Self {
            scenario_id,
            component_name: first.name.clone(),
            min_response_time: times.clone().fold(f64::INFINITY, f64::min),
            max_response_time: times.clone().fold(f64::NEG_INFINITY, f64::max),
            average_response_time: times.sum::<f64>() / results.len() as f64,
            success_count,
            failure_count: results.len() - success_count,
        })
    }
}
