//! Result persistence seam

use chaosai_common::{CommandRunResult, Result};

/// Receives trial results as the search progresses
pub trait ResultSink: Send {
    /// Called once per fresh execution, never for cache hits
    fn save_trial(&mut self, result: &CommandRunResult) -> Result<()>;

    /// Called once after the last generation
    fn finalize(
        &mut self,
        seen_population: &[CommandRunResult],
        best_of_generation: &[CommandRunResult],
    ) -> Result<()>;
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn save_trial(&mut self, _result: &CommandRunResult) -> Result<()> {
        Ok(())
    }

    fn finalize(
        &mut self,
        _seen_population: &[CommandRunResult],
        _best_of_generation: &[CommandRunResult],
    ) -> Result<()> {
        Ok(())
    }
}
