//! # ChaosAI Common
//!
//! Shared types, errors, and configuration for the ChaosAI chaos-scenario
//! search.
//!
//! ## Scenario model
//!
//! - [`Parameter`]: named value with a self-contained mutation law
//! - [`Scenario`]: one parameterized fault-injection trial
//! - [`CompositeScenario`]: two scenarios joined by an execution dependency
//! - [`BaseScenario`]: either of the above, nestable to any depth
//! - [`ScenarioFactory`]: random scenarios from the enabled families
//!
//! ## Results
//!
//! - [`CommandRunResult`]: the per-trial record
//! - [`FitnessResult`]: aggregate and per-item fitness
//! - [`HealthCheckResult`]: one application health sample

pub mod config;
pub mod error;
pub mod runner;
pub mod scenario;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{
    parse_override, ConfigFile, FitnessFunction, FitnessFunctionItem, FitnessFunctionType,
    HealthCheckApplicationConfig, HealthCheckConfig, ScenarioConfig,
};
pub use error::{ChaosError, Result, ScenarioError, WatcherError};
pub use runner::ScenarioRunner;
pub use scenario::{
    BaseScenario, CompositeDependency, CompositeScenario, MutationPolicy, Parameter,
    ParameterValue, Scenario, ScenarioFactory, ScenarioFamily,
};
pub use types::{
    fitness::{FitnessResult, FitnessScoreResult},
    health::HealthCheckResult,
    run_result::CommandRunResult,
};

/// ChaosAI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of generations
pub const DEFAULT_GENERATIONS: usize = 20;

/// Default population size
pub const DEFAULT_POPULATION_SIZE: usize = 10;

/// Default per-parameter mutation probability
pub const MUTATION_RATE: f64 = 0.7;

/// Default per-shared-parameter crossover probability
pub const CROSSOVER_RATE: f64 = 0.6;

/// Default probability that a mating composes instead of crossing over
pub const COMPOSITION_RATE: f64 = 0.0;

/// Default probability of injecting fresh individuals into a generation
pub const POPULATION_INJECTION_RATE: f64 = 0.0;

/// Default number of injected individuals
pub const POPULATION_INJECTION_SIZE: usize = 2;

/// Executor exit status meaning the run did not meet its SLOs
pub const SLO_FAILURE_RETURNCODE: i32 = 2;

/// Fitness penalty added for an SLO failure
pub const KRKN_FAILURE_SCORE: f64 = 5.0;
