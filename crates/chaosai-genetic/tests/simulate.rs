//! Generation loop tests against an in-process runner

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chaosai_common::{
    BaseScenario, ChaosError, CommandRunResult, ConfigFile, FitnessResult, Result, ScenarioRunner,
};
use chaosai_genetic::{GeneticAlgorithm, NullSink, ResultSink};
use chrono::Utc;
use config::FileFormat;

type Score = fn(&BaseScenario) -> Result<f64>;

struct FakeRunner {
    calls: AtomicUsize,
    score: Score,
}

impl FakeRunner {
    fn new(score: Score) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            score,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScenarioRunner for FakeRunner {
    async fn run(
        &self,
        scenario: &BaseScenario,
        generation_id: usize,
        scenario_id: u64,
    ) -> Result<CommandRunResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fitness = (self.score)(scenario)?;
        let now = Utc::now();

        Ok(CommandRunResult {
            generation_id,
            scenario_id,
            scenario: scenario.clone(),
            cmd: format!("krknctl run {}", scenario.name()),
            log: format!("trial {}", scenario_id),
            returncode: 0,
            start_time: now,
            end_time: now,
            fitness_result: FitnessResult::single(fitness),
            health_check_results: BTreeMap::new(),
        })
    }
}

#[derive(Default)]
struct Recorded {
    saved: Vec<u64>,
    seen: Vec<u64>,
    best: usize,
    finalized: usize,
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Recorded>>);

impl ResultSink for RecordingSink {
    fn save_trial(&mut self, result: &CommandRunResult) -> Result<()> {
        self.0.lock().unwrap().saved.push(result.scenario_id);
        Ok(())
    }

    fn finalize(
        &mut self,
        seen_population: &[CommandRunResult],
        best_of_generation: &[CommandRunResult],
    ) -> Result<()> {
        let mut recorded = self.0.lock().unwrap();
        recorded.seen = seen_population.iter().map(|r| r.scenario_id).collect();
        recorded.best = best_of_generation.len();
        recorded.finalized += 1;
        Ok(())
    }
}

fn config(population_size: usize, generations: usize, mutation_rate: f64) -> ConfigFile {
    config_with(population_size, generations, mutation_rate, "composition_rate: 0.0")
}

/// `extra` holds top-level keys, one per line
fn config_with(
    population_size: usize,
    generations: usize,
    mutation_rate: f64,
    extra: &str,
) -> ConfigFile {
    let doc = format!(
        r#"
kubeconfig_file_path: /tmp/kubeconfig
generations: {generations}
population_size: {population_size}
mutation_rate: {mutation_rate}
crossover_rate: 0.6
{extra}
seed: 42
fitness_function:
  query: sum(kube_pod_container_status_restarts_total)
scenario:
  pod-scenarios:
    namespace: ["a", "b"]
"#
    );
    ConfigFile::parse(&doc, FileFormat::Yaml, &[]).unwrap()
}

fn namespace(scenario: &BaseScenario) -> String {
    scenario.leaves()[0]
        .parameter("NAMESPACE")
        .map(|p| p.value.to_string())
        .unwrap_or_default()
}

fn by_namespace(scenario: &BaseScenario) -> Result<f64> {
    Ok(if namespace(scenario) == "b" { 2.0 } else { 1.0 })
}

fn zero(_: &BaseScenario) -> Result<f64> {
    Ok(0.0)
}

#[tokio::test]
async fn test_end_to_end_example() {
    let runner = FakeRunner::new(by_namespace);
    let mut ga =
        GeneticAlgorithm::new(config(4, 2, 1.0), runner.clone(), Box::new(NullSink)).unwrap();

    ga.simulate().await.unwrap();

    let best = ga.best_of_generation();
    assert_eq!(best.len(), 2);
    for result in best {
        assert!(["a", "b"].contains(&namespace(&result.scenario).as_str()));
    }
    assert_eq!(best[0].generation_id, 0);
    assert_eq!(best[1].generation_id, 1);
    assert!(runner.calls() >= 4);
}

#[tokio::test]
async fn test_seen_identity_is_never_rerun() {
    // No mutation: the two initial identities are the only reachable ones.
    let runner = FakeRunner::new(by_namespace);
    let sink = RecordingSink::default();
    let mut ga =
        GeneticAlgorithm::new(config(2, 3, 0.0), runner.clone(), Box::new(sink.clone())).unwrap();

    ga.simulate().await.unwrap();

    assert_eq!(runner.calls(), 2);
    let best = ga.best_of_generation();
    assert_eq!(best.len(), 3);
    assert_eq!(namespace(&best[0].scenario), "b");

    let first = &best[0];
    for (generation_id, later) in best.iter().enumerate() {
        assert_eq!(later.generation_id, generation_id);
        if later.scenario.identity() == first.scenario.identity() {
            assert_eq!(later.scenario_id, first.scenario_id);
            assert_eq!(later.log, first.log);
            assert_eq!(later.returncode, first.returncode);
            assert_eq!(later.fitness_score(), first.fitness_score());
        }
    }

    let recorded = sink.0.lock().unwrap();
    assert_eq!(recorded.saved, vec![1, 2]);
    assert_eq!(recorded.seen, vec![1, 2]);
    assert_eq!(recorded.best, 3);
    assert_eq!(recorded.finalized, 1);
}

#[tokio::test]
async fn test_zero_fitness_generation_still_reproduces() {
    let runner = FakeRunner::new(zero);
    let mut ga =
        GeneticAlgorithm::new(config(4, 3, 1.0), runner.clone(), Box::new(NullSink)).unwrap();

    ga.simulate().await.unwrap();

    assert_eq!(ga.best_of_generation().len(), 3);
    assert!(ga
        .best_of_generation()
        .iter()
        .all(|r| r.fitness_score() == 0.0));
}

#[tokio::test]
async fn test_single_member_population_terminates_early() {
    let runner = FakeRunner::new(by_namespace);
    let mut ga =
        GeneticAlgorithm::new(config(1, 5, 1.0), runner.clone(), Box::new(NullSink)).unwrap();

    ga.simulate().await.unwrap();

    assert_eq!(ga.best_of_generation().len(), 1);
    assert_eq!(runner.calls(), 1);
    assert!(ga.population().is_empty());
}

#[tokio::test]
async fn test_unfillable_population_is_an_error() {
    let runner = FakeRunner::new(by_namespace);
    let mut ga =
        GeneticAlgorithm::new(config(3, 2, 0.0), runner.clone(), Box::new(NullSink)).unwrap();

    let err = ga.simulate().await.unwrap_err();

    assert!(matches!(err, ChaosError::PopulationExhausted { target: 3, .. }));
    assert_eq!(runner.calls(), 0);
}

#[tokio::test]
async fn test_fitness_failure_aborts_search() {
    fn unreachable_backend(_: &BaseScenario) -> Result<f64> {
        Err(ChaosError::Metrics("connection refused".into()))
    }

    let runner = FakeRunner::new(unreachable_backend);
    let sink = RecordingSink::default();
    let mut ga =
        GeneticAlgorithm::new(config(4, 2, 1.0), runner.clone(), Box::new(sink.clone())).unwrap();

    let err = ga.simulate().await.unwrap_err();

    assert!(matches!(err, ChaosError::Metrics(_)));
    assert_eq!(runner.calls(), 1);
    assert_eq!(sink.0.lock().unwrap().finalized, 0);
}

#[tokio::test]
async fn test_scenario_ids_are_sequential() {
    let runner = FakeRunner::new(by_namespace);
    let mut ga =
        GeneticAlgorithm::new(config(6, 3, 1.0), runner.clone(), Box::new(NullSink)).unwrap();

    ga.simulate().await.unwrap();

    let seen = ga.seen_population();
    let ids: Vec<u64> = seen.iter().map(|r| r.scenario_id).collect();
    let expected: Vec<u64> = (1..=runner.calls() as u64).collect();
    assert_eq!(ids, expected);

    let identities: HashSet<String> = seen.iter().map(|r| r.scenario.identity()).collect();
    assert_eq!(identities.len(), seen.len());
    assert_eq!(ga.metrics().trials_executed.get(), runner.calls() as u64);
}

#[tokio::test]
async fn test_composition_offspring_are_evaluated_once() {
    let runner = FakeRunner::new(by_namespace);
    let sink = RecordingSink::default();
    let mut ga = GeneticAlgorithm::new(
        config_with(4, 4, 1.0, "composition_rate: 1.0"),
        runner.clone(),
        Box::new(sink.clone()),
    )
    .unwrap();

    ga.simulate().await.unwrap();

    let seen = ga.seen_population();
    assert!(seen.iter().any(|r| r.scenario.is_composite()));
    assert!(seen
        .iter()
        .filter(|r| r.generation_id > 0)
        .all(|r| r.scenario.is_composite()));
    assert!(seen.iter().any(|r| r.scenario.depth() > 2));

    let identities: HashSet<String> = seen.iter().map(|r| r.scenario.identity()).collect();
    assert_eq!(identities.len(), seen.len());
    assert_eq!(runner.calls(), seen.len());
    assert_eq!(sink.0.lock().unwrap().saved.len(), seen.len());

    let best = ga.best_of_generation();
    assert_eq!(best.len(), 4);
    assert!(best[1..].iter().all(|r| r.scenario.is_composite()));
    assert!(ga.population().iter().all(|s| s.is_composite()));
}

#[tokio::test]
async fn test_injection_grows_next_population() {
    let runner = FakeRunner::new(by_namespace);
    let mut ga = GeneticAlgorithm::new(
        config_with(
            4,
            3,
            1.0,
            "composition_rate: 0.0\npopulation_injection_rate: 1.0\npopulation_injection_size: 3",
        ),
        runner.clone(),
        Box::new(NullSink),
    )
    .unwrap();

    ga.simulate().await.unwrap();

    assert_eq!(ga.population().len(), 4 + 3);
    assert_eq!(ga.best_of_generation().len(), 3);
    assert_eq!(ga.metrics().generations_completed.get(), 3);

    let seen = ga.seen_population();
    let identities: HashSet<String> = seen.iter().map(|r| r.scenario.identity()).collect();
    assert_eq!(identities.len(), seen.len());
    assert_eq!(runner.calls(), seen.len());
}

#[tokio::test]
async fn test_exhausted_injection_is_skipped() {
    // Without mutation only two identities exist, so three fresh ones never fit.
    let runner = FakeRunner::new(by_namespace);
    let sink = RecordingSink::default();
    let mut ga = GeneticAlgorithm::new(
        config_with(
            2,
            3,
            0.0,
            "composition_rate: 0.0\npopulation_injection_rate: 1.0\npopulation_injection_size: 3",
        ),
        runner.clone(),
        Box::new(sink.clone()),
    )
    .unwrap();

    ga.simulate().await.unwrap();

    assert_eq!(ga.best_of_generation().len(), 3);
    assert_eq!(ga.population().len(), 2);
    assert_eq!(runner.calls(), 2);

    let recorded = sink.0.lock().unwrap();
    assert_eq!(recorded.finalized, 1);
    assert_eq!(recorded.best, 3);
}
