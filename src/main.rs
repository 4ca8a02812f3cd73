//! Forkguard: fork-safety coordination for a lock shared between threads.
//!
//! This is the entry point for the `forkguard` CLI. It parses arguments,
//! registers the fork hooks once for the whole process, runs the scenario and
//! maps the outcome to an exit code.

mod cli;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fork;
pub mod lock;
mod logging;
pub mod scenario;
pub mod worker;

#[cfg(test)]
mod test_support;

use cli::Cli;
use error::Result;
use fork::Duplicator;
use scenario::ProcessOrchestrator;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Warning: {:#}", e);
    }

    match run(&cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Run the scenario and return the exit code it maps to.
///
/// Only the original process returns from here; forked children exit inside
/// [`ProcessOrchestrator::run`].
fn run(cli: &Cli) -> Result<i32> {
    let config = cli.scenario_config()?;
    let effective = config.to_yaml()?;
    tracing::debug!(config = %effective, "effective configuration");
    let orchestrator = ProcessOrchestrator::new(config)?;

    let registry = orchestrator.hook_registry()?.install()?;
    tracing::info!(handlers = registry.len(), "fork hooks installed");
    let duplicator = Duplicator::new(registry);

    let report = orchestrator.run(&duplicator)?;
    tracing::debug!(forks = duplicator.completed(), "scenario finished");
    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        for round in &report.rounds {
            println!("{}", round);
        }
    }

    if report.hazard_observed() {
        tracing::warn!("a child blocked on the shared lock");
    }
    Ok(report.exit_code())
}
