//! Trial execution seam

use async_trait::async_trait;

use crate::error::Result;
use crate::scenario::BaseScenario;
use crate::types::run_result::CommandRunResult;

/// Executes one trial and scores it
///
/// Implementations run the scenario against the target system, watch
/// application health while it runs, and fold the metrics-backend score and
/// the health summary into the returned fitness. A failed fitness
/// computation is an error, never a zero score.
#[async_trait]
pub trait ScenarioRunner: Send + Sync {
    async fn run(
        &self,
        scenario: &BaseScenario,
        generation_id: usize,
        scenario_id: u64,
    ) -> Result<CommandRunResult>;
}
