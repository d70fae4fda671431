//! Generation loop
//!
//! ```text
//! Initialize -> { Evaluate -> Select -> Reproduce -> Inject? } x generations -> Finalize
//! ```
//!
//! Trials are evaluated one at a time, in population order.

use std::collections::HashMap;
use std::sync::Arc;

use chaosai_common::{
    BaseScenario, ChaosError, CommandRunResult, ConfigFile, Result, ScenarioRunner,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

use crate::operators::{composition, crossover, mutate};
use crate::population;
use crate::selection::{rank, select_parents};
use crate::sink::ResultSink;
use crate::telemetry::GeneticMetrics;

/// Evolutionary search over chaos scenarios
pub struct GeneticAlgorithm {
    config: ConfigFile,
    runner: Arc<dyn ScenarioRunner>,
    sink: Box<dyn ResultSink>,
    rng: StdRng,
    /// Individuals awaiting evaluation
    population: Vec<BaseScenario>,
    /// Identity -> first result for that identity
    seen_population: HashMap<String, CommandRunResult>,
    best_of_generation: Vec<CommandRunResult>,
    /// Id handed to the next real execution
    next_scenario_id: u64,
    metrics: GeneticMetrics,
}

impl GeneticAlgorithm {
    pub fn new(
        config: ConfigFile,
        runner: Arc<dyn ScenarioRunner>,
        sink: Box<dyn ResultSink>,
    ) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let metrics = GeneticMetrics::new().map_err(|e| ChaosError::Internal(e.to_string()))?;

        Ok(Self {
            config,
            runner,
            sink,
            rng,
            population: Vec::new(),
            seen_population: HashMap::new(),
            best_of_generation: Vec::new(),
            next_scenario_id: 1,
            metrics,
        })
    }

    /// Run every generation, then hand all results to the sink
    #[instrument(skip(self), fields(
        generations = self.config.generations,
        population_size = self.config.population_size
    ))]
    pub async fn simulate(&mut self) -> Result<()> {
        self.population = self.create_population(self.config.population_size)?;

        for generation_id in 0..self.config.generations {
            if self.population.is_empty() {
                warn!(generation_id, "Population is empty, terminating early");
                break;
            }
            info!(
                generation_id,
                population = self.population.len(),
                "Evaluating generation"
            );

            let population = std::mem::take(&mut self.population);
            let mut evaluated = Vec::with_capacity(population.len());
            for scenario in &population {
                evaluated.push(self.calculate_fitness(scenario, generation_id).await?);
            }

            rank(&mut evaluated);
            if let Some(best) = evaluated.first() {
                info!(
                    generation_id,
                    scenario_id = best.scenario_id,
                    fitness = best.fitness_score(),
                    scenario = %best.scenario,
                    "Best scenario of generation"
                );
                self.metrics.best_fitness.set(best.fitness_score());
                self.best_of_generation.push(best.clone());
            }

            self.population = self.reproduce(&evaluated);

            if self.rng.gen_bool(self.config.population_injection_rate.clamp(0.0, 1.0)) {
                match self.create_population(self.config.population_injection_size) {
                    Ok(injected) => {
                        debug!(count = injected.len(), "Injecting fresh scenarios");
                        self.population.extend(injected);
                    }
                    Err(e @ ChaosError::PopulationExhausted { .. }) => {
                        warn!(generation_id, error = %e, "Skipping injection for this generation");
                    }
                    Err(e) => return Err(e),
                }
            }

            self.metrics.generations_completed.inc();
        }

        let seen = self.seen_population();
        self.sink.finalize(&seen, &self.best_of_generation)?;
        info!(
            trials = seen.len(),
            generations = self.best_of_generation.len(),
            "Search complete"
        );
        Ok(())
    }

    /// `size` unique random scenarios, mutated once
    pub fn create_population(&mut self, size: usize) -> Result<Vec<BaseScenario>> {
        population::create_population(
            &self.config.scenario,
            size,
            self.config.mutation_rate,
            &mut self.rng,
        )
    }

    /// Evaluate one scenario, reusing the cached result for a known identity
    pub async fn calculate_fitness(
        &mut self,
        scenario: &BaseScenario,
        generation_id: usize,
    ) -> Result<CommandRunResult> {
        let key = scenario.identity();
        if let Some(cached) = self.seen_population.get(&key) {
            debug!(
                scenario_id = cached.scenario_id,
                scenario = %key,
                "Scenario already evaluated, reusing result"
            );
            self.metrics.cache_hits.inc();
            let mut result = cached.clone();
            result.generation_id = generation_id;
            return Ok(result);
        }

        let scenario_id = self.next_scenario_id;
        self.next_scenario_id += 1;
        self.metrics.trials_executed.inc();

        let result = self.runner.run(scenario, generation_id, scenario_id).await?;
        info!(
            scenario_id,
            returncode = result.returncode,
            fitness = result.fitness_score(),
            "Trial complete"
        );

        self.sink.save_trial(&result)?;
        self.seen_population.insert(key, result.clone());
        Ok(result)
    }

    fn reproduce(&mut self, evaluated: &[CommandRunResult]) -> Vec<BaseScenario> {
        let matings = self.config.population_size / 2;
        let mut next = Vec::with_capacity(matings * 2);

        for _ in 0..matings {
            let Some((parent_a, parent_b)) = select_parents(evaluated, &mut self.rng) else {
                break;
            };
            let (a, b) = (parent_a.scenario.clone(), parent_b.scenario.clone());

            let (mut a, mut b) = if self.rng.gen_bool(self.config.composition_rate.clamp(0.0, 1.0))
            {
                composition(&a, &b, &mut self.rng)
            } else {
                crossover(a, b, self.config.crossover_rate, &mut self.rng)
            };

            mutate(&mut a, self.config.mutation_rate, &mut self.rng);
            mutate(&mut b, self.config.mutation_rate, &mut self.rng);
            next.push(a);
            next.push(b);
        }

        next
    }

    /// Best trial of each evaluated generation, in generation order
    pub fn best_of_generation(&self) -> &[CommandRunResult] {
        &self.best_of_generation
    }

    /// Every distinct trial, ordered by scenario id
    pub fn seen_population(&self) -> Vec<CommandRunResult> {
        let mut seen: Vec<CommandRunResult> = self.seen_population.values().cloned().collect();
        seen.sort_by_key(|r| r.scenario_id);
        seen
    }

    pub fn population(&self) -> &[BaseScenario] {
        &self.population
    }

    pub fn metrics(&self) -> &GeneticMetrics {
        &self.metrics
    }
}
