use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Replay a priority-donation scenario and report how priorities evolve.
#[derive(Parser, Debug)]
#[command(name = "donor-sim", about = "Replay priority-donation scenarios")]
pub struct CliArgs {
    /// Scenario file (TOML)
    #[arg(env = "DONOR_SCENARIO")]
    pub scenario: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text", env = "DONOR_FORMAT")]
    pub format: OutputFormat,

    /// Scheduler config file; replaces the scenario's [scheduler] table
    #[arg(long, env = "DONOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Validate the scenario without running it
    #[arg(long)]
    pub check: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
