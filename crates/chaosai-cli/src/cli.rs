use std::path::PathBuf;

use chaosai_runner::RunnerType;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::report::OutputFormat;

#[derive(Parser)]
#[command(
    name = "chaosai",
    about = "ChaosAI: genetic search for the most disruptive chaos scenarios",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Increase log verbosity (-v for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the genetic search
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to the ChaosAI config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to store results
    #[arg(short, long, default_value = "./")]
    pub output: PathBuf,

    /// Format of the result files
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Scenario launcher, detected from installed tools when omitted
    #[arg(short, long, value_enum)]
    pub runner_type: Option<RunnerTypeArg>,

    /// Config parameter override, repeatable
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RunnerTypeArg {
    /// krknctl
    Cli,
    /// podman with the krkn-hub image
    Hub,
}

impl From<RunnerTypeArg> for RunnerType {
    fn from(arg: RunnerTypeArg) -> Self {
        match arg {
            RunnerTypeArg::Cli => RunnerType::Cli,
            RunnerTypeArg::Hub => RunnerType::Hub,
        }
    }
}
