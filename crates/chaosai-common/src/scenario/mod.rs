//! Scenario data model
//!
//! - [`Parameter`]: named value with its own mutation law
//! - [`Scenario`]: one fault-injection trial of a given family
//! - [`CompositeScenario`]: two subtrees plus a dependency
//! - [`ScenarioFactory`]: random construction from configuration

pub mod factory;
pub mod model;
pub mod parameter;

pub use factory::{ScenarioFactory, ScenarioFamily, DUMMY_SCENARIO_NAME, HOG_IMAGE};
pub use model::{BaseScenario, CompositeDependency, CompositeScenario, Scenario, COMPOSITE_NAME};
pub use parameter::{MutationPolicy, Parameter, ParameterValue};
