//! Population construction

use std::collections::HashSet;

use chaosai_common::{BaseScenario, ChaosError, Result, ScenarioConfig, ScenarioFactory};
use rand::Rng;
use tracing::{debug, warn};

use crate::operators::mutate;

/// Attempts allowed to fill a population of `target` unique scenarios
pub fn retry_cap(target: usize) -> usize {
    (target.saturating_mul(50)).max(100)
}

/// Build `size` random, mutated scenarios with pairwise-distinct identities
///
/// A scenario that fails to construct is logged and discarded. Filling
/// stops with [`ChaosError::PopulationExhausted`] once [`retry_cap`]
/// attempts have been spent.
pub fn create_population<R: Rng + ?Sized>(
    config: &ScenarioConfig,
    size: usize,
    mutation_rate: f64,
    rng: &mut R,
) -> Result<Vec<BaseScenario>> {
    let cap = retry_cap(size);
    let mut population = Vec::with_capacity(size);
    let mut identities = HashSet::with_capacity(size);
    let mut attempts = 0;

    while population.len() < size {
        if attempts >= cap {
            return Err(ChaosError::PopulationExhausted {
                target: size,
                attempts,
            });
        }
        attempts += 1;

        let mut scenario = match ScenarioFactory::generate_random_scenario(config, rng) {
            Ok(scenario) => BaseScenario::Single(scenario),
            Err(ChaosError::NoScenarioFamilyConfigured) => {
                return Err(ChaosError::NoScenarioFamilyConfigured)
            }
            Err(e) => {
                warn!(error = %e, "Unable to generate scenario, retrying");
                continue;
            }
        };
        mutate(&mut scenario, mutation_rate, rng);

        if identities.insert(scenario.identity()) {
            population.push(scenario);
        } else {
            debug!(scenario = %scenario, "Duplicate scenario rejected");
        }
    }

    Ok(population)
}
