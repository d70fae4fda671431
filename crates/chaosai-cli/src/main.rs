//! ChaosAI - genetic search for disruptive chaos scenarios

mod cli;
mod report;

use std::sync::Arc;

use anyhow::{bail, Context};
use chaosai_common::{parse_override, ConfigFile};
use chaosai_genetic::GeneticAlgorithm;
use chaosai_runner::KrknRunner;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, RunArgs};
use crate::report::FsReporter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Commands::Run(args) => run(args).await,
    };

    if let Err(e) = outcome {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = if verbose == 0 { "info" } else { "debug" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let Some(config_path) = args.config else {
        bail!("Config file path is required, pass it with --config");
    };
    if !config_path.is_file() {
        bail!("Config file not found: {}", config_path.display());
    }

    let overrides = args
        .params
        .iter()
        .map(|raw| parse_override(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let config = ConfigFile::load(&config_path, &overrides)
        .with_context(|| format!("Invalid config file {}", config_path.display()))?;
    tracing::info!(
        path = %config_path.display(),
        generations = config.generations,
        population_size = config.population_size,
        "Loaded configuration"
    );

    let registry = prometheus::Registry::new();
    let reporter = FsReporter::new(&args.output, args.format, registry.clone())?;
    reporter.save_config(&config)?;
    tracing::info!(run_id = %reporter.run_id(), output = %args.output.display(), "Starting run");

    let runner = KrknRunner::connect(
        config.clone(),
        &args.output,
        args.runner_type.map(Into::into),
    )
    .await
    .context("Unable to set up the scenario runner")?;
    tracing::info!(runner_type = %runner.runner_type(), "Scenario runner ready");

    let mut genetic = GeneticAlgorithm::new(config, Arc::new(runner), Box::new(reporter))?;
    genetic.metrics().register(&registry)?;
    genetic.simulate().await?;

    Ok(())
}
