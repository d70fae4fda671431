//! Filesystem reporter
//!
//! ```text
//! <output>/
//!   config.<fmt>
//!   scenarios/scenario_<id>.<fmt>
//!   logs/scenario_<id>.log
//!   best_scenarios.<fmt>
//!   reports/health_check_report.<fmt>
//!   metrics.prom
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chaosai_common::{BaseScenario, ChaosError, CommandRunResult, ConfigFile, Result};
use chaosai_genetic::ResultSink;
use chaosai_runner::HealthSummary;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => {
                serde_yaml::to_string(value).map_err(|e| ChaosError::Serialization(e.to_string()))
            }
        }
    }
}

#[derive(Serialize)]
struct BestScenario<'a> {
    generation_id: usize,
    scenario_id: u64,
    scenario: &'a BaseScenario,
    fitness_score: f64,
}

#[derive(Serialize)]
struct BestScenarios<'a> {
    run_id: Uuid,
    completed_at: DateTime<Utc>,
    trials: usize,
    best_of_generation: Vec<BestScenario<'a>>,
}

/// Writes run results under an output directory
pub struct FsReporter {
    output_dir: PathBuf,
    format: OutputFormat,
    registry: Registry,
    run_id: Uuid,
}

impl FsReporter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        format: OutputFormat,
        registry: Registry,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        for sub in ["scenarios", "logs", "reports"] {
            let dir = output_dir.join(sub);
            fs::create_dir_all(&dir).map_err(persistence(&dir))?;
        }

        Ok(Self {
            output_dir,
            format,
            registry,
            run_id: Uuid::now_v7(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Echo the resolved configuration
    pub fn save_config(&self, config: &ConfigFile) -> Result<()> {
        let path = self.file(&format!("config.{}", self.format.extension()));
        self.write(&path, &self.format.render(config)?)
    }

    fn file(&self, relative: &str) -> PathBuf {
        self.output_dir.join(relative)
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content).map_err(persistence(path))?;
        debug!(path = %path.display(), "Saved");
        Ok(())
    }

    fn save_health_report(&self, seen_population: &[CommandRunResult]) -> Result<()> {
        let rows: Vec<HealthSummary> = seen_population
            .iter()
            .flat_map(|result| {
                result
                    .health_check_results
                    .values()
                    .filter_map(move |samples| {
                        HealthSummary::from_results(result.scenario_id, samples)
                    })
            })
            .collect();

        let path = self.file(&format!(
            "reports/health_check_report.{}",
            self.format.extension()
        ));
        self.write(&path, &self.format.render(&rows)?)
    }

    fn save_metrics(&self) -> Result<()> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| ChaosError::Persistence(e.to_string()))?;
        let text =
            String::from_utf8(buffer).map_err(|e| ChaosError::Persistence(e.to_string()))?;
        self.write(&self.file("metrics.prom"), &text)
    }
}

impl ResultSink for FsReporter {
    fn save_trial(&mut self, result: &CommandRunResult) -> Result<()> {
        let log_path = self.file(&format!("logs/scenario_{}.log", result.scenario_id));
        self.write(&log_path, &result.log)?;

        let mut record = result.clone();
        record.log = log_path.display().to_string();
        let path = self.file(&format!(
            "scenarios/scenario_{}.{}",
            result.scenario_id,
            self.format.extension()
        ));
        self.write(&path, &self.format.render(&record)?)
    }

    fn finalize(
        &mut self,
        seen_population: &[CommandRunResult],
        best_of_generation: &[CommandRunResult],
    ) -> Result<()> {
        let best = BestScenarios {
            run_id: self.run_id,
            completed_at: Utc::now(),
            trials: seen_population.len(),
            best_of_generation: best_of_generation
                .iter()
                .map(|r| BestScenario {
                    generation_id: r.generation_id,
                    scenario_id: r.scenario_id,
                    scenario: &r.scenario,
                    fitness_score: r.fitness_score(),
                })
                .collect(),
        };
        let path = self.file(&format!("best_scenarios.{}", self.format.extension()));
        self.write(&path, &self.format.render(&best)?)?;

        self.save_health_report(seen_population)?;
        self.save_metrics()?;

        info!(output = %self.output_dir.display(), run_id = %self.run_id, "Results saved");
        Ok(())
    }
}

fn persistence(path: &Path) -> impl Fn(std::io::Error) -> ChaosError + '_ {
    move |e| ChaosError::Persistence(format!("{}: {}", path.display(), e))
}
