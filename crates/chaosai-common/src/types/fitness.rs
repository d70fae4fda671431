//! Fitness results

use serde::Serialize;

/// Score of one weighted fitness item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitnessScoreResult {
    /// Fitness item id
    pub id: u32,
    /// Raw query result
    pub fitness_score: f64,
    /// `weight * fitness_score`
    pub weighted_score: f64,
}

/// Fitness measured for one trial
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FitnessResult {
    /// Per-item scores, empty when a single query is used
    pub scores: Vec<FitnessScoreResult>,
    /// Overall fitness score
    pub fitness_score: f64,
}

impl FitnessResult {
    /// Result of a single fitness query
    pub fn single(fitness_score: f64) -> Self {
        Self {
            scores: Vec::new(),
            fitness_score,
        }
    }

    /// Aggregate weighted item scores
    pub fn from_items(scores: Vec<FitnessScoreResult>) -> Self {
        let fitness_score = scores.iter().map(|s| s.weighted_score).sum();
        Self {
            scores,
            fitness_score,
        }
    }
}
