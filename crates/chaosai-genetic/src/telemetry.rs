//! Prometheus metrics for the search loop

use prometheus::{Gauge, IntCounter, Registry};

/// Search progress counters
#[derive(Clone)]
pub struct GeneticMetrics {
    pub trials_executed: IntCounter,
    pub cache_hits: IntCounter,
    pub generations_completed: IntCounter,
    pub best_fitness: Gauge,
}

impl GeneticMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            trials_executed: IntCounter::new(
                "chaosai_trials_executed_total",
                "Scenarios handed to the runner",
            )?,
            cache_hits: IntCounter::new(
                "chaosai_cache_hits_total",
                "Population members served from the seen-population cache",
            )?,
            generations_completed: IntCounter::new(
                "chaosai_generations_completed_total",
                "Generations fully evaluated",
            )?,
            best_fitness: Gauge::new(
                "chaosai_best_fitness",
                "Fitness of the best scenario in the latest generation",
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.trials_executed.clone()))?;
        registry.register(Box::new(self.cache_hits.clone()))?;
        registry.register(Box::new(self.generations_completed.clone()))?;
        registry.register(Box::new(self.best_fitness.clone()))?;
        Ok(())
    }
}
