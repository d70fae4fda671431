//! Dependency graph for composite scenarios
//!
//! A composite tree is flattened into `id -> node` for `krknctl graph run`.
//! Ids are assigned in allocation order starting at 0.
//!
//! Every subtree has an *anchor*, the node that dependants of the subtree
//! attach to:
//!
//! | subtree            | anchor           |
//! |--------------------|------------------|
//! | leaf               | itself           |
//! | `NONE` composite   | its dummy root   |
//! | `A_ON_B` composite | anchor of A      |
//! | `B_ON_A` composite | anchor of B      |
//!
//! Entry nodes of a subtree inherit the dependency of their parent.

use std::collections::BTreeMap;

use chaosai_common::{BaseScenario, CompositeDependency, Result, Scenario, ScenarioFactory};
use serde::{Serialize, Serializer};

/// Registry prefix of krkn-hub scenario images
pub const KRKN_HUB_IMAGE: &str = "containers.krkn-chaos.dev/krkn-chaos/krkn-hub";

pub type NodeId = u32;

/// One executable node of the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub image: String,
    pub name: String,
    /// Parameters in scenario order
    #[serde(serialize_with = "serialize_env")]
    pub env: Vec<(String, String)>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_depends_on"
    )]
    pub depends_on: Option<NodeId>,
}

impl GraphNode {
    fn new(scenario: &Scenario, depends_on: Option<NodeId>) -> Self {
        Self {
            image: format!("{}:{}", KRKN_HUB_IMAGE, scenario.name),
            name: scenario.name.clone(),
            env: scenario
                .parameters
                .iter()
                .map(|p| (p.name.clone(), p.rendered()))
                .collect(),
            depends_on,
        }
    }
}

fn serialize_env<S: Serializer>(
    env: &[(String, String)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(env.iter().map(|(k, v)| (k, v)))
}

// krknctl references nodes by their string key.
fn serialize_depends_on<S: Serializer>(
    depends_on: &Option<NodeId>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match depends_on {
        Some(id) => serializer.serialize_str(&id.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Flattened composite scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScenarioGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
}

impl ScenarioGraph {
    /// Flatten a scenario tree; a plain scenario yields a single root node
    pub fn flatten(scenario: &BaseScenario) -> Self {
        let mut builder = GraphBuilder::default();
        builder.expand(scenario, None);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, GraphNode> {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes without a dependency
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.depends_on.is_none())
            .map(|(id, _)| *id)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Default)]
struct GraphBuilder {
    next_id: NodeId,
    nodes: BTreeMap<NodeId, GraphNode>,
}

impl GraphBuilder {
    fn push(&mut self, scenario: &Scenario, depends_on: Option<NodeId>) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, GraphNode::new(scenario, depends_on));
        id
    }

    /// Add `scenario` below `depends_on`, returning its anchor
    fn expand(&mut self, scenario: &BaseScenario, depends_on: Option<NodeId>) -> NodeId {
        let composite = match scenario {
            BaseScenario::Single(single) => return self.push(single, depends_on),
            BaseScenario::Composite(composite) => composite,
        };

        match composite.dependency {
            CompositeDependency::None => {
                let root = self.push(&ScenarioFactory::create_dummy_scenario(), depends_on);
                self.expand(&composite.scenario_a, Some(root));
                self.expand(&composite.scenario_b, Some(root));
                root
            }
            CompositeDependency::AOnB => {
                let b = self.expand(&composite.scenario_b, depends_on);
                self.expand(&composite.scenario_a, Some(b))
            }
            CompositeDependency::BOnA => {
                let a = self.expand(&composite.scenario_a, depends_on);
                self.expand(&composite.scenario_b, Some(a))
            }
        }
    }
}
