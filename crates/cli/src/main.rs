mod cli;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use donor_sched::{Scenario, SchedulerConfig};

use crate::cli::{CliArgs, OutputFormat};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    donor_core::config::load_dotenv();
    let args = CliArgs::parse();

    let mut scenario = Scenario::from_file(&args.scenario)
        .with_context(|| format!("failed to load scenario {}", args.scenario.display()))?;
    if let Some(path) = &args.config {
        scenario.scheduler = SchedulerConfig::from_file(path)
            .with_context(|| format!("failed to load scheduler config {}", path.display()))?;
    }

    if args.check {
        println!(
            "{}: {} thread(s), {} queue(s), {} step(s) ok",
            args.scenario.display(),
            scenario.threads.len(),
            scenario.queues.len(),
            scenario.steps.len()
        );
        return Ok(());
    }

    info!(scenario = %scenario.name, steps = scenario.steps.len(), "running scenario");
    let report = scenario
        .run()
        .with_context(|| format!("scenario {} failed", args.scenario.display()))?;
    info!(scenario = %report.name, "scenario finished");

    match args.format {
        OutputFormat::Text => print!("{}", report::render_text(&report)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
            println!("{json}");
        }
    }
    Ok(())
}
