//! Scenario tree
//!
//! A [`BaseScenario`] is either a single fault-injection [`Scenario`] or a
//! [`CompositeScenario`] joining two subtrees with an execution-order
//! dependency. Leaves are always single scenarios.

use std::fmt;
use std::hash::{Hash, Hasher};

use rand::Rng;
use serde::Serialize;

use super::parameter::Parameter;

/// Name carried by every composite node
pub const COMPOSITE_NAME: &str = "composite";

/// One concrete, parameterized fault-injection trial
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    /// Scenario family, e.g. `pod-scenarios`
    pub name: String,
    /// Parameters in family order
    pub parameters: Vec<Parameter>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Identity key: name plus the ordered, stringified parameter values.
    ///
    /// Two scenarios with the same key are the same trial.
    pub fn identity(&self) -> String {
        let values = self
            .parameters
            .iter()
            .map(|p| p.value.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.name, values)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }
}

impl PartialEq for Scenario {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Scenario {}

impl Hash for Scenario {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

/// Execution-order relation between the two children of a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositeDependency {
    /// Both children hang off a synthetic dummy root
    None,
    /// A runs after B
    AOnB,
    /// B runs after A
    BOnA,
}

impl CompositeDependency {
    pub const ALL: [CompositeDependency; 3] = [Self::None, Self::AOnB, Self::BOnA];

    /// Uniform draw over all dependency kinds
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for CompositeDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CompositeDependency::None => "NONE",
            CompositeDependency::AOnB => "A_ON_B",
            CompositeDependency::BOnA => "B_ON_A",
        };
        f.write_str(label)
    }
}

/// Two subtrees combined with a dependency
#[derive(Debug, Clone, Serialize)]
pub struct CompositeScenario {
    pub name: String,
    pub scenario_a: Box<BaseScenario>,
    pub scenario_b: Box<BaseScenario>,
    pub dependency: CompositeDependency,
}

impl CompositeScenario {
    pub fn new(a: BaseScenario, b: BaseScenario, dependency: CompositeDependency) -> Self {
        Self {
            name: COMPOSITE_NAME.to_string(),
            scenario_a: Box::new(a),
            scenario_b: Box::new(b),
            dependency,
        }
    }
}

/// Polymorphic scenario: a leaf or a composite node
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaseScenario {
    Single(Scenario),
    Composite(CompositeScenario),
}

impl BaseScenario {
    pub fn name(&self) -> &str {
        match self {
            BaseScenario::Single(s) => &s.name,
            BaseScenario::Composite(c) => &c.name,
        }
    }

    /// Identity key used by the seen-population cache
    pub fn identity(&self) -> String {
        match self {
            BaseScenario::Single(s) => s.identity(),
            BaseScenario::Composite(c) => format!(
                "{}[{}]({} | {})",
                c.name,
                c.dependency,
                c.scenario_a.identity(),
                c.scenario_b.identity()
            ),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, BaseScenario::Composite(_))
    }

    /// Leaf scenarios in left-to-right order
    pub fn leaves(&self) -> Vec<&Scenario> {
        match self {
            BaseScenario::Single(s) => vec![s],
            BaseScenario::Composite(c) => {
                let mut leaves = c.scenario_a.leaves();
                leaves.extend(c.scenario_b.leaves());
                leaves
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            BaseScenario::Single(_) => 1,
            BaseScenario::Composite(c) => 1 + c.scenario_a.depth().max(c.scenario_b.depth()),
        }
    }
}

impl From<Scenario> for BaseScenario {
    fn from(scenario: Scenario) -> Self {
        BaseScenario::Single(scenario)
    }
}

impl From<CompositeScenario> for BaseScenario {
    fn from(composite: CompositeScenario) -> Self {
        BaseScenario::Composite(composite)
    }
}

impl PartialEq for BaseScenario {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for BaseScenario {}

impl Hash for BaseScenario {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for BaseScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}
