//! # ChaosAI Runner
//!
//! Executes chaos scenarios with krkn and measures how much they hurt.
//!
//! ## Components
//!
//! - [`KrknRunner`]: the [`ScenarioRunner`](chaosai_common::ScenarioRunner) implementation
//! - [`ScenarioGraph`]: composite scenarios flattened for `krknctl graph run`
//! - [`PrometheusClient`]: fitness queries against Prometheus / Thanos
//! - [`HealthCheckWatcher`]: concurrent application polling during a trial
//!
//! ## Fitness
//!
//! ```text
//! fitness = metric score
//!         + 5                          (exit status 2, include_krkn_failure)
//!         + sum(app failure ratio)     (include_health_check_failure)
//!         + sum(app latency outliers)  (include_health_check_response_time)
//! ```

pub mod executor;
pub mod graph;
pub mod health;
pub mod metrics;
pub mod runner;

pub use executor::{CommandExecutor, CommandOutput, DryRunExecutor, ShellExecutor};
pub use graph::{GraphNode, ScenarioGraph};
pub use health::{HealthCheckWatcher, HealthSummary, WatcherState};
pub use metrics::{MetricsBackend, PrometheusClient, RandomBackend};
pub use runner::{KrknRunner, RunnerType};
