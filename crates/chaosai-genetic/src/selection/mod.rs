//! Ranking and fitness-proportional parent selection

use chaosai_common::CommandRunResult;
use rand::distributions::WeightedIndex;
use rand::prelude::*;

/// Sort evaluated trials by descending fitness
///
/// The sort is stable, so equal scores keep evaluation order.
pub fn rank(results: &mut [CommandRunResult]) {
    results.sort_by(|a, b| b.fitness_score().total_cmp(&a.fitness_score()));
}

/// Draw two parents by roulette wheel
///
/// Weights are fitness scores clamped at zero. When no trial has positive
/// fitness the draw is uniform. Returns `None` only for an empty input.
pub fn select_parents<'a, R: Rng + ?Sized>(
    results: &'a [CommandRunResult],
    rng: &mut R,
) -> Option<(&'a CommandRunResult, &'a CommandRunResult)> {
    if results.is_empty() {
        return None;
    }

    let weights: Vec<f64> = results
        .iter()
        .map(|r| {
            let score = r.fitness_score();
            if score.is_finite() {
                score.max(0.0)
            } else {
                0.0
            }
        })
        .collect();

    match WeightedIndex::new(&weights) {
        Ok(wheel) => Some((&results[wheel.sample(rng)], &results[wheel.sample(rng)])),
        Err(_) => Some((results.choose(rng)?, results.choose(rng)?)),
    }
}
