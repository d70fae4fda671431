//! Random scenario construction
//!
//! Each scenario family has a fixed parameter list; choice parameters are
//! sampled from the family's configured candidates.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::model::Scenario;
use super::parameter::Parameter;
use crate::config::{
    AppOutageScenarioConfig, ContainerScenarioConfig, NodeHogScenarioConfig, PodScenarioConfig,
    ScenarioConfig,
};
use crate::error::{ChaosError, Result, ScenarioError};

/// Image used by the node hog families
pub const HOG_IMAGE: &str = "quay.io/krkn-chaos/krkn-hog";

/// Family name of the synthetic no-op scenario
pub const DUMMY_SCENARIO_NAME: &str = "dummy-scenario";

/// Enabled-by-configuration scenario families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScenarioFamily {
    PodScenarios,
    ApplicationOutages,
    ContainerScenarios,
    NodeCpuHog,
    NodeMemoryHog,
}

impl ScenarioFamily {
    /// Name of the krkn-hub scenario image / krknctl scenario
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioFamily::PodScenarios => "pod-scenarios",
            ScenarioFamily::ApplicationOutages => "application-outages",
            ScenarioFamily::ContainerScenarios => "container-scenarios",
            ScenarioFamily::NodeCpuHog => "node-cpu-hog",
            ScenarioFamily::NodeMemoryHog => "node-memory-hog",
        }
    }
}

impl fmt::Display for ScenarioFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds random scenarios from a scenario configuration
pub struct ScenarioFactory;

impl ScenarioFactory {
    /// Sample one enabled family uniformly and build a scenario for it
    pub fn generate_random_scenario<R: Rng + ?Sized>(
        config: &ScenarioConfig,
        rng: &mut R,
    ) -> Result<Scenario> {
        let families = config.enabled_families();
        let family = families
            .choose(rng)
            .copied()
            .ok_or(ChaosError::NoScenarioFamilyConfigured)?;

        Ok(Self::create(family, config, rng)?)
    }

    /// Build a scenario of the given family
    pub fn create<R: Rng + ?Sized>(
        family: ScenarioFamily,
        config: &ScenarioConfig,
        rng: &mut R,
    ) -> std::result::Result<Scenario, ScenarioError> {
        let missing = || ScenarioError::FamilyNotConfigured(family.name());
        match family {
            ScenarioFamily::PodScenarios => {
                Self::create_pod_scenario(config.pod_scenarios.as_ref().ok_or_else(missing)?, rng)
            }
            ScenarioFamily::ApplicationOutages => Self::create_application_outage_scenario(
                config.application_outages.as_ref().ok_or_else(missing)?,
                rng,
            ),
            ScenarioFamily::ContainerScenarios => Self::create_container_scenario(
                config.container_scenarios.as_ref().ok_or_else(missing)?,
                rng,
            ),
            ScenarioFamily::NodeCpuHog => {
                Self::create_cpu_hog_scenario(config.node_cpu_hog.as_ref().ok_or_else(missing)?, rng)
            }
            ScenarioFamily::NodeMemoryHog => Self::create_memory_hog_scenario(
                config.node_memory_hog.as_ref().ok_or_else(missing)?,
                rng,
            ),
        }
    }

    pub fn create_pod_scenario<R: Rng + ?Sized>(
        config: &PodScenarioConfig,
        rng: &mut R,
    ) -> std::result::Result<Scenario, ScenarioError> {
        Ok(Scenario::new(
            ScenarioFamily::PodScenarios.name(),
            vec![
                Parameter::sampled("NAMESPACE", &config.namespace, rng)?,
                Parameter::sampled("POD_LABEL", &config.pod_label, rng)?,
                Parameter::sampled("NAME_PATTERN", &config.name_pattern, rng)?,
                disruption_count(),
                Parameter::fixed("KILL_TIMEOUT", 120),
                expected_recovery_time(),
            ],
        ))
    }

    pub fn create_application_outage_scenario<R: Rng + ?Sized>(
        config: &AppOutageScenarioConfig,
        rng: &mut R,
    ) -> std::result::Result<Scenario, ScenarioError> {
        Ok(Scenario::new(
            ScenarioFamily::ApplicationOutages.name(),
            vec![
                Parameter::perturbed("DURATION", 120, 15, 10, 600),
                Parameter::sampled("NAMESPACE", &config.namespace, rng)?,
                Parameter::sampled("POD_SELECTOR", &config.pod_selector, rng)?,
                Parameter::choice(
                    "BLOCK_TRAFFIC_TYPE",
                    "[Ingress, Egress]",
                    &["[Ingress, Egress]", "[Ingress]", "[Egress]"],
                ),
            ],
        ))
    }

    pub fn create_container_scenario<R: Rng + ?Sized>(
        config: &ContainerScenarioConfig,
        rng: &mut R,
    ) -> std::result::Result<Scenario, ScenarioError> {
        Ok(Scenario::new(
            ScenarioFamily::ContainerScenarios.name(),
            vec![
                Parameter::sampled("NAMESPACE", &config.namespace, rng)?,
                Parameter::sampled("LABEL_SELECTOR", &config.label_selector, rng)?,
                disruption_count(),
                Parameter::sampled("CONTAINER_NAME", &config.container_name, rng)?,
                Parameter::choice("ACTION", "1", &["1", "9"]),
                expected_recovery_time(),
            ],
        ))
    }

    pub fn create_cpu_hog_scenario<R: Rng + ?Sized>(
        config: &NodeHogScenarioConfig,
        rng: &mut R,
    ) -> std::result::Result<Scenario, ScenarioError> {
        Ok(Scenario::new(
            ScenarioFamily::NodeCpuHog.name(),
            vec![
                total_chaos_duration(),
                Parameter::uniform_int("NODE_CPU_CORE", 2, 1, 4),
                Parameter::perturbed("NODE_CPU_PERCENTAGE", 50, 15, 10, 100),
                Parameter::fixed("NAMESPACE", "default"),
                Parameter::sampled("NODE_SELECTOR", &config.node_selector, rng)?,
                Parameter::sampled("TAINTS", &config.taints, rng)?,
                number_of_nodes(),
                Parameter::fixed("IMAGE", HOG_IMAGE),
            ],
        ))
    }

    pub fn create_memory_hog_scenario<R: Rng + ?Sized>(
        config: &NodeHogScenarioConfig,
        rng: &mut R,
    ) -> std::result::Result<Scenario, ScenarioError> {
        Ok(Scenario::new(
            ScenarioFamily::NodeMemoryHog.name(),
            vec![
                total_chaos_duration(),
                Parameter::perturbed("MEMORY_CONSUMPTION_PERCENTAGE", 90, 15, 10, 95)
                    .with_suffix("%"),
                Parameter::uniform_int("NUMBER_OF_WORKERS", 1, 1, 4),
                Parameter::fixed("NAMESPACE", "default"),
                Parameter::sampled("NODE_SELECTOR", &config.node_selector, rng)?,
                Parameter::sampled("TAINTS", &config.taints, rng)?,
                number_of_nodes(),
                Parameter::fixed("IMAGE", HOG_IMAGE),
            ],
        ))
    }

    /// Zero-effect placeholder used as the root of dependency-free graphs
    pub fn create_dummy_scenario() -> Scenario {
        Scenario::new(
            DUMMY_SCENARIO_NAME,
            vec![
                Parameter::fixed("END", 10),
                Parameter::fixed("EXIT_STATUS", 0),
            ],
        )
    }
}

fn disruption_count() -> Parameter {
    Parameter::uniform_int("DISRUPTION_COUNT", 1, 1, 25)
}

// Recovery time is a property of the system under test, not a search dimension.
fn expected_recovery_time() -> Parameter {
    Parameter::fixed("EXPECTED_RECOVERY_TIME", 60)
}

fn total_chaos_duration() -> Parameter {
    Parameter::perturbed("TOTAL_CHAOS_DURATION", 60, 15, 10, 600)
}

fn number_of_nodes() -> Parameter {
    Parameter::uniform_int("NUMBER_OF_NODES", 1, 1, 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hog_config() -> NodeHogScenarioConfig {
        NodeHogScenarioConfig {
            node_selector: vec!["node-role.kubernetes.io/worker=".to_string()],
            taints: vec![String::new()],
        }
    }

    #[test]
    fn test_no_family_configured() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = ScenarioFactory::generate_random_scenario(&ScenarioConfig::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, ChaosError::NoScenarioFamilyConfigured));
    }

    #[test]
    fn test_pod_scenario_parameters() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = ScenarioConfig {
            pod_scenarios: Some(PodScenarioConfig {
                namespace: vec!["a".into(), "b".into()],
                ..Default::default()
            }),
            ..Default::default()
        };

        let scenario = ScenarioFactory::generate_random_scenario(&config, &mut rng).unwrap();
        let names: Vec<&str> = scenario.parameter_names().collect();

        assert_eq!(scenario.name, "pod-scenarios");
        assert_eq!(
            names,
            vec![
                "NAMESPACE",
                "POD_LABEL",
                "NAME_PATTERN",
                "DISRUPTION_COUNT",
                "KILL_TIMEOUT",
                "EXPECTED_RECOVERY_TIME"
            ]
        );
        assert!(scenario.parameters.iter().all(|p| p.in_domain()));
    }

    #[test]
    fn test_every_family_is_sampled() {
        let mut rng = StdRng::seed_from_u64(9);
        let config = ScenarioConfig {
            pod_scenarios: Some(PodScenarioConfig::default()),
            application_outages: Some(AppOutageScenarioConfig {
                namespace: vec!["shop".into()],
                pod_selector: vec!["{app: cart}".into()],
            }),
            container_scenarios: Some(ContainerScenarioConfig {
                namespace: vec!["shop".into()],
                label_selector: vec!["app=cart".into()],
                container_name: vec!["cart".into()],
            }),
            node_cpu_hog: Some(hog_config()),
            node_memory_hog: Some(hog_config()),
        };

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let scenario = ScenarioFactory::generate_random_scenario(&config, &mut rng).unwrap();
            seen.insert(scenario.name);
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_empty_candidates_fail_construction() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = NodeHogScenarioConfig {
            node_selector: vec!["worker".into()],
            taints: vec![],
        };

        let err = ScenarioFactory::create_cpu_hog_scenario(&config, &mut rng).unwrap_err();
        assert!(err.to_string().contains("TAINTS"));
    }

    #[test]
    fn test_memory_hog_renders_percentage() {
        let mut rng = StdRng::seed_from_u64(1);
        let scenario = ScenarioFactory::create_memory_hog_scenario(&hog_config(), &mut rng).unwrap();
        let param = scenario.parameter("MEMORY_CONSUMPTION_PERCENTAGE").unwrap();
        assert_eq!(param.rendered(), "90%");
    }

    #[test]
    fn test_dummy_scenario() {
        let dummy = ScenarioFactory::create_dummy_scenario();
        assert_eq!(dummy.name, DUMMY_SCENARIO_NAME);
        assert_eq!(dummy.identity(), "dummy-scenario(10, 0)");
    }
}
