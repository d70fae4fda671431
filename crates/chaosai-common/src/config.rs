//! ChaosAI configuration
//!
//! The configuration file is YAML or JSON, read through the `config` crate and
//! validated before any generation runs.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ChaosError, Result};
use crate::scenario::ScenarioFamily;

/// Pod kill scenario candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodScenarioConfig {
    #[serde(default = "default_pod_namespaces")]
    pub namespace: Vec<String>,
    #[serde(default = "default_pod_labels")]
    pub pod_label: Vec<String>,
    #[serde(default = "default_name_patterns")]
    pub name_pattern: Vec<String>,
}

impl Default for PodScenarioConfig {
    fn default() -> Self {
        Self {
            namespace: default_pod_namespaces(),
            pod_label: default_pod_labels(),
            name_pattern: default_name_patterns(),
        }
    }
}

fn default_pod_namespaces() -> Vec<String> {
    vec!["openshift-.*".to_string()]
}

fn default_pod_labels() -> Vec<String> {
    vec![String::new()]
}

fn default_name_patterns() -> Vec<String> {
    vec![".*".to_string()]
}

/// Application outage scenario candidates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppOutageScenarioConfig {
    #[serde(default)]
    pub namespace: Vec<String>,
    #[serde(default)]
    pub pod_selector: Vec<String>,
}

/// Container fault scenario candidates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerScenarioConfig {
    #[serde(default)]
    pub namespace: Vec<String>,
    #[serde(default)]
    pub label_selector: Vec<String>,
    #[serde(default)]
    pub container_name: Vec<String>,
}

/// Node CPU / memory hog scenario candidates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeHogScenarioConfig {
    #[serde(default)]
    pub node_selector: Vec<String>,
    #[serde(default)]
    pub taints: Vec<String>,
}

/// Scenario families; a family is enabled when its block is present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(rename = "pod-scenarios", default)]
    pub pod_scenarios: Option<PodScenarioConfig>,
    #[serde(rename = "application-outages", default)]
    pub application_outages: Option<AppOutageScenarioConfig>,
    #[serde(rename = "container-scenarios", default)]
    pub container_scenarios: Option<ContainerScenarioConfig>,
    #[serde(rename = "node-cpu-hog", default)]
    pub node_cpu_hog: Option<NodeHogScenarioConfig>,
    #[serde(rename = "node-memory-hog", default)]
    pub node_memory_hog: Option<NodeHogScenarioConfig>,
}

impl ScenarioConfig {
    /// Families with a configuration block, in a stable order
    pub fn enabled_families(&self) -> Vec<ScenarioFamily> {
        let mut families = Vec::new();
        if self.pod_scenarios.is_some() {
            families.push(ScenarioFamily::PodScenarios);
        }
        if self.application_outages.is_some() {
            families.push(ScenarioFamily::ApplicationOutages);
        }
        if self.container_scenarios.is_some() {
            families.push(ScenarioFamily::ContainerScenarios);
        }
        if self.node_cpu_hog.is_some() {
            families.push(ScenarioFamily::NodeCpuHog);
        }
        if self.node_memory_hog.is_some() {
            families.push(ScenarioFamily::NodeMemoryHog);
        }
        families
    }
}

/// How a fitness query is evaluated over the trial window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessFunctionType {
    /// `metric(end) - metric(start)`, for counters
    #[default]
    Point,
    /// One aggregate query over `[start, end]`
    Range,
}

/// One weighted SLO query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessFunctionItem {
    /// Assigned in file order when omitted
    #[serde(default)]
    pub id: u32,
    /// PromQL query
    pub query: String,
    #[serde(rename = "type", default)]
    pub fitness_type: FitnessFunctionType,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Fitness function definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitnessFunction {
    /// PromQL query; takes precedence over `items`
    #[serde(default)]
    pub query: Option<String>,
    #[serde(rename = "type", default)]
    pub fitness_type: FitnessFunctionType,
    #[serde(default)]
    pub include_krkn_failure: bool,
    #[serde(default)]
    pub include_health_check_failure: bool,
    #[serde(default)]
    pub include_health_check_response_time: bool,
    #[serde(default)]
    pub items: Vec<FitnessFunctionItem>,
}

/// Health check target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckApplicationConfig {
    pub name: String,
    pub url: String,
    /// Expected status code
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Seconds between polls
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_status_code() -> u16 {
    200
}

fn default_timeout() -> u64 {
    4
}

fn default_interval() -> u64 {
    2
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default)]
    pub stop_watcher_on_failure: bool,
    #[serde(default)]
    pub applications: Vec<HealthCheckApplicationConfig>,
}

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Path to kubeconfig
    pub kubeconfig_file_path: String,
    /// `key=value` overrides supplied on the command line
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Total number of generations to run
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Initial population size
    #[serde(default = "default_population_size")]
    pub population_size: usize,

    /// Per-parameter mutation probability
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Per-shared-parameter crossover swap probability
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Probability that a mating uses composition instead of crossover
    #[serde(default = "default_composition_rate")]
    pub composition_rate: f64,

    /// Probability that fresh random individuals join a new generation
    #[serde(default = "default_injection_rate")]
    pub population_injection_rate: f64,
    /// How many fresh individuals are injected
    #[serde(default = "default_injection_size")]
    pub population_injection_size: usize,

    /// Seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,

    pub fitness_function: FitnessFunction,
    #[serde(default)]
    pub health_checks: HealthCheckConfig,

    #[serde(default)]
    pub scenario: ScenarioConfig,
}

fn default_generations() -> usize {
    crate::DEFAULT_GENERATIONS
}

fn default_population_size() -> usize {
    crate::DEFAULT_POPULATION_SIZE
}

fn default_mutation_rate() -> f64 {
    crate::MUTATION_RATE
}

fn default_crossover_rate() -> f64 {
    crate::CROSSOVER_RATE
}

fn default_composition_rate() -> f64 {
    crate::COMPOSITION_RATE
}

fn default_injection_rate() -> f64 {
    crate::POPULATION_INJECTION_RATE
}

fn default_injection_size() -> usize {
    crate::POPULATION_INJECTION_SIZE
}

impl ConfigFile {
    /// Load, apply overrides, and validate a configuration file
    pub fn load(path: &Path, overrides: &[(String, String)]) -> Result<Self> {
        if !path.is_file() {
            return Err(ChaosError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let raw = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        debug!(path = %path.display(), "Loaded configuration file");

        Self::prepare(raw.try_deserialize()?, overrides)
    }

    /// Parse configuration from an in-memory document
    pub fn parse(
        content: &str,
        format: config::FileFormat,
        overrides: &[(String, String)],
    ) -> Result<Self> {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(content, format))
            .build()?;
        Self::prepare(raw.try_deserialize()?, overrides)
    }

    fn prepare(mut cfg: Self, overrides: &[(String, String)]) -> Result<Self> {
        cfg.apply_parameters(overrides);
        cfg.assign_item_ids();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Record overrides and substitute `$key` in health check URLs
    pub fn apply_parameters(&mut self, overrides: &[(String, String)]) {
        for (key, value) in overrides {
            self.parameters.insert(key.clone(), value.clone());
        }

        for app in &mut self.health_checks.applications {
            for (key, value) in &self.parameters {
                app.url = app.url.replace(&format!("${}", key), value);
            }
        }
    }

    /// Give every fitness item without an id the next free one
    pub fn assign_item_ids(&mut self) {
        let used: HashSet<u32> = self
            .fitness_function
            .items
            .iter()
            .map(|item| item.id)
            .filter(|id| *id != 0)
            .collect();

        let mut next_id = 1u32;
        for item in &mut self.fitness_function.items {
            if item.id != 0 {
                continue;
            }
            while used.contains(&next_id) {
                next_id += 1;
            }
            item.id = next_id;
            next_id += 1;
        }
    }

    /// Reject configurations the search cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.scenario.enabled_families().is_empty() {
            return Err(ChaosError::NoScenarioFamilyConfigured);
        }

        let fitness = &self.fitness_function;
        if fitness.query.is_none() && fitness.items.is_empty() {
            return Err(ChaosError::Config(
                "Please define at least one fitness function in query or items".into(),
            ));
        }
        if fitness.query.is_some() && !fitness.items.is_empty() {
            warn!("fitness_function.query is set; fitness_function.items will be ignored");
        }

        let mut seen_ids = HashSet::new();
        for item in &fitness.items {
            if !(0.0..=1.0).contains(&item.weight) {
                return Err(ChaosError::Config(format!(
                    "Fitness item {} weight {} is outside the range [0.0, 1.0]",
                    item.id, item.weight
                )));
            }
            if !seen_ids.insert(item.id) {
                return Err(ChaosError::Config(format!(
                    "Duplicate fitness item id {}",
                    item.id
                )));
            }
        }

        for (name, rate) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
            ("composition_rate", self.composition_rate),
            ("population_injection_rate", self.population_injection_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ChaosError::Config(format!(
                    "{} {} is outside the range [0.0, 1.0]",
                    name, rate
                )));
            }
        }

        if self.population_size == 0 {
            return Err(ChaosError::Config("population_size must be at least 1".into()));
        }
        if self.generations == 0 {
            return Err(ChaosError::Config("generations must be at least 1".into()));
        }

        for app in &self.health_checks.applications {
            if app.interval == 0 || app.timeout == 0 {
                return Err(ChaosError::Config(format!(
                    "Health check {} needs a non-zero interval and timeout",
                    app.name
                )));
            }
        }

        Ok(())
    }
}

/// Split a `key=value` command line override
pub fn parse_override(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ChaosError::Config(format!(
            "Invalid parameter override '{}', expected key=value",
            raw
        ))),
    }
}
