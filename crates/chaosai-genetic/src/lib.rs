//! # ChaosAI Genetic
//!
//! Genetic search for chaos scenarios that hurt a system the most.
//!
//! ## Generation
//!
//! 1. Evaluate every individual through a [`ScenarioRunner`](chaosai_common::ScenarioRunner),
//!    reusing cached results for identities already seen
//! 2. Rank by fitness and keep the best
//! 3. Draw parents by roulette wheel
//! 4. Cross over or compose each pair, then mutate the offspring
//! 5. Optionally inject fresh random individuals
//!
//! ## Fitness
//!
//! Higher is better: a larger score means the scenario caused more damage.

pub mod engine;
pub mod operators;
pub mod population;
pub mod selection;
pub mod sink;
pub mod telemetry;

pub use engine::GeneticAlgorithm;
pub use sink::{NullSink, ResultSink};
pub use telemetry::GeneticMetrics;
