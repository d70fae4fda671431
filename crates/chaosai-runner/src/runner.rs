//! krkn scenario runner
//!
//! Renders a scenario into a krkn-hub (podman) or krknctl command, runs it
//! while the health check watcher polls the monitored applications, and
//! scores the trial from the metrics backend and the health samples.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chaosai_common::{
    BaseScenario, ChaosError, CommandRunResult, CompositeScenario, ConfigFile, FitnessFunctionType,
    FitnessResult, FitnessScoreResult, Result, Scenario, ScenarioRunner, KRKN_FAILURE_SCORE,
    SLO_FAILURE_RETURNCODE,
};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::executor::{env_is_truthy, CommandExecutor, DryRunExecutor, ShellExecutor};
use crate::graph::{ScenarioGraph, KRKN_HUB_IMAGE};
use crate::health::{summarize_response_time, summarize_success_rate, HealthCheckWatcher};
use crate::metrics::{MetricsBackend, PrometheusClient, RandomBackend};

/// Token in range queries replaced by the trial length in minutes
pub const RANGE_TOKEN: &str = "$range$";

/// Tool used to launch single scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerType {
    /// `krknctl run`
    Cli,
    /// `podman run` of the krkn-hub image
    Hub,
}

impl fmt::Display for RunnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerType::Cli => f.write_str("cli"),
            RunnerType::Hub => f.write_str("hub"),
        }
    }
}

impl FromStr for RunnerType {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cli" | "krknctl" => Ok(RunnerType::Cli),
            "hub" | "krknhub" | "krkn-hub" => Ok(RunnerType::Hub),
            other => Err(ChaosError::Config(format!("Unknown runner type '{}'", other))),
        }
    }
}

pub struct KrknRunner {
    config: ConfigFile,
    output_dir: PathBuf,
    runner_type: RunnerType,
    executor: Arc<dyn CommandExecutor>,
    metrics: Arc<dyn MetricsBackend>,
    watch_health: bool,
}

impl KrknRunner {
    pub fn new(
        config: ConfigFile,
        output_dir: impl Into<PathBuf>,
        runner_type: RunnerType,
        executor: Arc<dyn CommandExecutor>,
        metrics: Arc<dyn MetricsBackend>,
    ) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            runner_type,
            executor,
            metrics,
            watch_health: true,
        }
    }

    /// Wire the runner from the environment
    ///
    /// `MOCK_RUN` swaps in a dry-run executor with no health checks;
    /// `MOCK_FITNESS` swaps in random fitness values. Otherwise the
    /// Prometheus endpoint is discovered and the runner type, when not
    /// given, is detected from the installed tools.
    pub async fn connect(
        config: ConfigFile,
        output_dir: impl Into<PathBuf>,
        runner_type: Option<RunnerType>,
    ) -> Result<Self> {
        let mock_run = env_is_truthy("MOCK_RUN");
        let executor: Arc<dyn CommandExecutor> = if mock_run {
            info!("MOCK_RUN set, scenarios will not be executed");
            Arc::new(DryRunExecutor)
        } else {
            Arc::new(ShellExecutor)
        };

        let metrics: Arc<dyn MetricsBackend> = if env_is_truthy("MOCK_FITNESS") {
            info!("MOCK_FITNESS set, fitness values are random");
            Arc::new(RandomBackend)
        } else {
            Arc::new(PrometheusClient::discover(&config.kubeconfig_file_path, &ShellExecutor).await?)
        };

        let runner_type = match runner_type {
            Some(runner_type) => {
                debug!(%runner_type, "Using user provided runner type");
                runner_type
            }
            None => Self::detect(executor.as_ref()).await?,
        };

        let mut runner = Self::new(config, output_dir, runner_type, executor, metrics);
        runner.watch_health = !mock_run;
        Ok(runner)
    }

    /// Prefer krknctl, fall back to podman
    pub async fn detect(executor: &dyn CommandExecutor) -> Result<RunnerType> {
        let krknctl = executor.execute("krknctl --version").await?.returncode == 0;
        if !krknctl {
            warn!("krknctl is not available");
        }
        let podman = executor.execute("podman --version").await?.returncode == 0;
        if !podman {
            warn!("podman is not available");
        }

        match (krknctl, podman) {
            (true, _) => Ok(RunnerType::Cli),
            (false, true) => Ok(RunnerType::Hub),
            (false, false) => Err(ChaosError::Execution(
                "krknctl and podman are not available. Please install krknctl or podman".into(),
            )),
        }
    }

    pub fn runner_type(&self) -> RunnerType {
        self.runner_type
    }

    pub fn set_health_checks(&mut self, enabled: bool) {
        self.watch_health = enabled;
    }

    /// Command line for a single scenario
    pub fn runner_command(&self, scenario: &Scenario) -> String {
        let kubeconfig = &self.config.kubeconfig_file_path;
        match self.runner_type {
            RunnerType::Hub => {
                let env_list = scenario
                    .parameters
                    .iter()
                    .map(|p| format!("-e {}=\"{}\"", p.name, shell_escape(&p.rendered())))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(
                    "podman run --env-host=true -e PUBLISH_KRAKEN_STATUS=\"False\" \
                     -e TELEMETRY_PROMETHEUS_BACKUP=\"False\" -e WAIT_DURATION=0 {} --net=host \
                     -v {}:/home/krkn/.kube/config:Z {}:{}",
                    env_list, kubeconfig, KRKN_HUB_IMAGE, scenario.name
                )
            }
            RunnerType::Cli => {
                let env_list = scenario
                    .parameters
                    .iter()
                    .map(|p| {
                        format!(
                            "--{} \"{}\"",
                            p.name.to_lowercase().replace('_', "-"),
                            shell_escape(&p.rendered())
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(
                    "krknctl run {} --telemetry-prometheus-backup False --wait-duration 0 \
                     --kubeconfig {} {}",
                    scenario.name, kubeconfig, env_list
                )
            }
        }
    }

    /// Write the dependency graph under `<output>/graphs` and return the
    /// `krknctl graph run` command for it
    pub fn graph_command(&self, scenario: &CompositeScenario) -> Result<String> {
        let graph_dir = self.output_dir.join("graphs");
        std::fs::create_dir_all(&graph_dir)?;

        let graph = ScenarioGraph::flatten(&BaseScenario::Composite(scenario.clone()));
        let mut file = tempfile::Builder::new()
            .prefix("graph_")
            .suffix(".json")
            .tempfile_in(&graph_dir)?;
        file.write_all(graph.to_json_pretty()?.as_bytes())?;
        let (_, path) = file
            .keep()
            .map_err(|e| ChaosError::Io(format!("unable to keep graph file: {}", e)))?;
        info!(path = %path.display(), nodes = graph.len(), "Created scenario graph");

        Ok(format!(
            "krknctl graph run {} --kubeconfig {}",
            path.display(),
            self.config.kubeconfig_file_path
        ))
    }

    /// One fitness query over the trial window
    pub async fn calculate_fitness_value(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        query: &str,
        fitness_type: FitnessFunctionType,
    ) -> Result<f64> {
        let value = match fitness_type {
            FitnessFunctionType::Point => self.calculate_point_fitness(start, end, query).await,
            FitnessFunctionType::Range => self.calculate_range_fitness(start, end, query).await,
        };
        value.map_err(|e| {
            error!(error = %e, query, "Fitness function calculation failed");
            e
        })
    }

    /// Weighted score per fitness item
    pub async fn calculate_fitness_score_for_items(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FitnessResult> {
        let mut scores = Vec::with_capacity(self.config.fitness_function.items.len());
        for item in &self.config.fitness_function.items {
            let raw = self
                .calculate_fitness_value(start, end, &item.query, item.fitness_type)
                .await?;
            scores.push(FitnessScoreResult {
                id: item.id,
                fitness_score: raw,
                weighted_score: item.weight * raw,
            });
        }
        Ok(FitnessResult::from_items(scores))
    }

    /// Counter delta: `metric(end) - metric(start)`
    async fn calculate_point_fitness(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        query: &str,
    ) -> Result<f64> {
        debug!(query, "Calculating point fitness");
        let at_start = self.metrics.query_range(query, start, start).await?;
        let at_end = self.metrics.query_range(query, end, end).await?;
        Ok(at_end - at_start)
    }

    /// Aggregate over the window, `$range$` set to the elapsed minutes
    async fn calculate_range_fitness(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        query: &str,
    ) -> Result<f64> {
        debug!(query, "Calculating range fitness");
        let query = if query.contains(RANGE_TOKEN) {
            let minutes = (end - start).num_minutes().max(1);
            query.replace(RANGE_TOKEN, &format!("{}m", minutes))
        } else {
            warn!("Range fitness query has no $range$ token, using its fixed range");
            query.to_string()
        };
        self.metrics.query_range(&query, start, end).await
    }

    async fn base_fitness(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<FitnessResult> {
        let fitness = &self.config.fitness_function;
        if let Some(query) = &fitness.query {
            let value = self
                .calculate_fitness_value(start, end, query, fitness.fitness_type)
                .await?;
            Ok(FitnessResult::single(value))
        } else if !fitness.items.is_empty() {
            self.calculate_fitness_score_for_items(start, end).await
        } else {
            Ok(FitnessResult::default())
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl ScenarioRunner for KrknRunner {
    #[instrument(skip(self, scenario), fields(scenario = %scenario))]
    async fn run(
        &self,
        scenario: &BaseScenario,
        generation_id: usize,
        scenario_id: u64,
    ) -> Result<CommandRunResult> {
        let cmd = match scenario {
            BaseScenario::Single(single) => self.runner_command(single),
            BaseScenario::Composite(composite) => self.graph_command(composite)?,
        };

        let start_time = Utc::now();
        let mut watcher = HealthCheckWatcher::new(self.config.health_checks.clone());
        if self.watch_health {
            watcher.run()?;
        }
        let execution = self.executor.execute(&cmd).await;
        let health_check_results = if self.watch_health {
            watcher.stop().await?;
            watcher.get_results()?
        } else {
            BTreeMap::new()
        };
        let output = execution?;
        let end_time = Utc::now();
        debug!(returncode = output.returncode, "Scenario finished");

        let mut fitness_result = self.base_fitness(start_time, end_time).await?;

        let fitness = &self.config.fitness_function;
        if fitness.include_krkn_failure && output.returncode == SLO_FAILURE_RETURNCODE {
            fitness_result.fitness_score += KRKN_FAILURE_SCORE;
        }
        if fitness.include_health_check_failure {
            fitness_result.fitness_score += summarize_success_rate(&health_check_results);
        }
        if fitness.include_health_check_response_time {
            fitness_result.fitness_score += summarize_response_time(&health_check_results);
        }

        Ok(CommandRunResult {
            generation_id,
            scenario_id,
            scenario: scenario.clone(),
            cmd,
            log: output.log,
            returncode: output.returncode,
            start_time,
            end_time,
            fitness_result,
            health_check_results,
        })
    }
}

/// Escape a value for use inside double quotes
fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CommandOutput;
    use chaosai_common::{CompositeDependency, Parameter};
    use config::FileFormat;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const CONFIG: &str = r#"
kubeconfig_file_path: /root/.kube/config
fitness_function:
  query: sum(kube_pod_container_status_restarts_total)
scenario:
  pod-scenarios:
    namespace: ["shop"]
"#;

    fn config(extra: &str) -> ConfigFile {
        let doc = if extra.is_empty() {
            CONFIG.to_string()
        } else {
            format!(
                "kubeconfig_file_path: /root/.kube/config\nscenario:\n  pod-scenarios:\n    namespace: [shop]\n{}",
                extra
            )
        };
        ConfigFile::parse(&doc, FileFormat::Yaml, &[]).unwrap()
    }

    /// Returns queued values in order and records every query
    #[derive(Default)]
    struct ScriptedBackend {
        values: Mutex<VecDeque<f64>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn with(values: &[f64]) -> Arc<Self> {
            Arc::new(Self {
                values: Mutex::new(values.iter().copied().collect()),
                queries: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl MetricsBackend for ScriptedBackend {
        async fn query_range(
            &self,
            query: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<f64> {
            self.queries.lock().unwrap().push(query.to_string());
            self.values
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ChaosError::Metrics("query returned no samples".into()))
        }
    }

    /// Exits with a fixed status and records commands
    struct FixedExecutor {
        returncode: i32,
        commands: Mutex<Vec<String>>,
    }

    impl FixedExecutor {
        fn new(returncode: i32) -> Arc<Self> {
            Arc::new(Self {
                returncode,
                commands: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl CommandExecutor for FixedExecutor {
        async fn execute(&self, cmd: &str) -> Result<CommandOutput> {
            self.commands.lock().unwrap().push(cmd.to_string());
            Ok(CommandOutput {
                log: format!("ran {}", cmd),
                returncode: self.returncode,
            })
        }
    }

    /// Only the listed commands succeed
    struct Installed(&'static [&'static str]);

    #[async_trait]
    impl CommandExecutor for Installed {
        async fn execute(&self, cmd: &str) -> Result<CommandOutput> {
            let found = self.0.iter().any(|tool| cmd.starts_with(tool));
            Ok(CommandOutput {
                log: String::new(),
                returncode: if found { 0 } else { 127 },
            })
        }
    }

    fn pod() -> Scenario {
        Scenario::new(
            "pod-scenarios",
            vec![
                Parameter::fixed("NAMESPACE", "shop"),
                Parameter::fixed("NAME_PATTERN", "^cart$"),
                Parameter::uniform_int("DISRUPTION_COUNT", 2, 1, 25),
            ],
        )
    }

    fn runner(
        config: ConfigFile,
        runner_type: RunnerType,
        executor: Arc<dyn CommandExecutor>,
        metrics: Arc<dyn MetricsBackend>,
        output_dir: &Path,
    ) -> KrknRunner {
        KrknRunner::new(config, output_dir, runner_type, executor, metrics)
    }

    #[test]
    fn test_hub_command() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(
            config(""),
            RunnerType::Hub,
            FixedExecutor::new(0),
            ScriptedBackend::with(&[]),
            dir.path(),
        );

        let cmd = runner.runner_command(&pod());
        assert!(cmd.starts_with("podman run --env-host=true"));
        assert!(cmd.contains(r#"-e NAMESPACE="shop" -e NAME_PATTERN="^cart\$" -e DISRUPTION_COUNT="2""#));
        assert!(cmd.contains("-v /root/.kube/config:/home/krkn/.kube/config:Z"));
        assert!(cmd.ends_with("containers.krkn-chaos.dev/krkn-chaos/krkn-hub:pod-scenarios"));
    }

    #[test]
    fn test_cli_command() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(
            config(""),
            RunnerType::Cli,
            FixedExecutor::new(0),
            ScriptedBackend::with(&[]),
            dir.path(),
        );

        let cmd = runner.runner_command(&pod());
        assert_eq!(
            cmd,
            "krknctl run pod-scenarios --telemetry-prometheus-backup False --wait-duration 0 \
             --kubeconfig /root/.kube/config --namespace \"shop\" --name-pattern \"^cart\\$\" \
             --disruption-count \"2\""
        );
    }

    #[test]
    fn test_runner_type_from_str() {
        assert_eq!("hub".parse::<RunnerType>().unwrap(), RunnerType::Hub);
        assert_eq!("CLI".parse::<RunnerType>().unwrap(), RunnerType::Cli);
        assert!("docker".parse::<RunnerType>().is_err());
    }

    #[tokio::test]
    async fn test_detect_prefers_krknctl() {
        assert_eq!(
            KrknRunner::detect(&Installed(&["krknctl", "podman"])).await.unwrap(),
            RunnerType::Cli
        );
        assert_eq!(
            KrknRunner::detect(&Installed(&["podman"])).await.unwrap(),
            RunnerType::Hub
        );
        assert!(KrknRunner::detect(&Installed(&[])).await.is_err());
    }

    #[tokio::test]
    async fn test_point_fitness_is_delta() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::with(&[3.0, 10.0]);
        let runner = runner(
            config(""),
            RunnerType::Cli,
            FixedExecutor::new(0),
            backend.clone(),
            dir.path(),
        );

        let result = runner.run(&pod().into(), 0, 1).await.unwrap();

        assert_eq!(result.fitness_score(), 7.0);
        assert!(result.fitness_result.scores.is_empty());
        assert_eq!(result.scenario_id, 1);
        assert_eq!(result.log, format!("ran {}", result.cmd));
        assert_eq!(backend.queries.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_range_token_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::with(&[0.8]);
        let runner = runner(
            config(
                "fitness_function:\n  type: range\n  query: max_over_time(cpu[$range$])\n",
            ),
            RunnerType::Cli,
            FixedExecutor::new(0),
            backend.clone(),
            dir.path(),
        );

        let result = runner.run(&pod().into(), 0, 1).await.unwrap();

        assert_eq!(result.fitness_score(), 0.8);
        assert_eq!(
            backend.queries.lock().unwrap().as_slice(),
            ["max_over_time(cpu[1m])".to_string()]
        );
    }

    #[tokio::test]
    async fn test_items_are_weighted() {
        let dir = tempfile::tempdir().unwrap();
        let items = r#"fitness_function:
  items:
    - query: restarts
      type: range
      weight: 0.5
    - id: 7
      query: errors
      type: range
"#;
        let runner = runner(
            config(items),
            RunnerType::Cli,
            FixedExecutor::new(0),
            ScriptedBackend::with(&[4.0, 2.0]),
            dir.path(),
        );

        let result = runner.run(&pod().into(), 0, 1).await.unwrap();
        let scores = &result.fitness_result.scores;

        assert_eq!(scores.len(), 2);
        assert_eq!((scores[0].id, scores[0].weighted_score), (1, 2.0));
        assert_eq!((scores[1].id, scores[1].weighted_score), (7, 2.0));
        assert_eq!(result.fitness_score(), 4.0);
    }

    #[tokio::test]
    async fn test_slo_failure_penalty() {
        let dir = tempfile::tempdir().unwrap();
        let extra = "fitness_function:\n  type: range\n  query: up\n  include_krkn_failure: true\n";

        let failing = runner(
            config(extra),
            RunnerType::Cli,
            FixedExecutor::new(SLO_FAILURE_RETURNCODE),
            ScriptedBackend::with(&[1.0]),
            dir.path(),
        );
        let result = failing.run(&pod().into(), 0, 1).await.unwrap();
        assert_eq!(result.returncode, 2);
        assert_eq!(result.fitness_score(), 1.0 + KRKN_FAILURE_SCORE);

        let crashed = runner(
            config(extra),
            RunnerType::Cli,
            FixedExecutor::new(1),
            ScriptedBackend::with(&[1.0]),
            dir.path(),
        );
        let result = crashed.run(&pod().into(), 0, 2).await.unwrap();
        assert_eq!(result.fitness_score(), 1.0);
    }

    #[tokio::test]
    async fn test_metrics_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(
            config(""),
            RunnerType::Cli,
            FixedExecutor::new(0),
            ScriptedBackend::with(&[]),
            dir.path(),
        );

        let err = runner.run(&pod().into(), 0, 1).await.unwrap_err();
        assert!(matches!(err, ChaosError::Metrics(_)));
    }

    #[tokio::test]
    async fn test_composite_runs_graph() {
        let dir = tempfile::tempdir().unwrap();
        let executor = FixedExecutor::new(0);
        let runner = runner(
            config(""),
            RunnerType::Hub,
            executor.clone(),
            ScriptedBackend::with(&[0.0, 0.0]),
            dir.path(),
        );
        let composite: BaseScenario =
            CompositeScenario::new(pod().into(), pod().into(), CompositeDependency::None).into();

        let result = runner.run(&composite, 3, 9).await.unwrap();

        assert!(result.cmd.starts_with("krknctl graph run "));
        assert!(result.cmd.ends_with("--kubeconfig /root/.kube/config"));
        let graphs: Vec<_> = std::fs::read_dir(dir.path().join("graphs"))
            .unwrap()
            .collect::<std::io::Result<_>>()
            .unwrap();
        assert_eq!(graphs.len(), 1);

        let path = graphs[0].path();
        assert!(result.cmd.contains(&path.display().to_string()));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 3);
        assert_eq!(result.generation_id, 3);
        assert_eq!(executor.commands.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape(r#"a"b$c`d\e"#), r#"a\"b\$c\`d\\e"#);
        assert_eq!(shell_escape("[Ingress, Egress]"), "[Ingress, Egress]");
    }
}
