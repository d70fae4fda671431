//! Mutation: per-parameter, at the configured rate

use chaosai_common::{BaseScenario, Scenario};
use rand::Rng;

/// Mutate every leaf of the tree; composite nodes carry no parameters
pub fn mutate<R: Rng + ?Sized>(scenario: &mut BaseScenario, rate: f64, rng: &mut R) {
    match scenario {
        BaseScenario::Single(single) => mutate_scenario(single, rate, rng),
        BaseScenario::Composite(composite) => {
            mutate(&mut composite.scenario_a, rate, rng);
            mutate(&mut composite.scenario_b, rate, rng);
        }
    }
}

/// Mutate each parameter independently with probability `rate`
pub fn mutate_scenario<R: Rng + ?Sized>(scenario: &mut Scenario, rate: f64, rng: &mut R) {
    let rate = rate.clamp(0.0, 1.0);
    for parameter in &mut scenario.parameters {
        if rng.gen_bool(rate) {
            parameter.mutate(rng);
        }
    }
}
