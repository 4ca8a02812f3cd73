//! CLI argument parsing for forkguard.
//!
//! Uses clap derive macros. Every flag is optional: with no arguments the
//! guarded scenario runs with the default configuration.

use crate::config::ScenarioConfig;
use crate::error::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Gap kept between the child's lock timeout and its exit timeout when only
/// the former is overridden.
const CHILD_EXIT_GRACE_MS: u64 = 2000;

/// Forkguard: fork a multi-threaded process without inheriting a held lock.
///
/// A worker thread takes a shared lock and holds it while the main thread
/// forks. With the fork hooks registered, the fork waits for the worker to
/// release the lock and the child finds it free. With `--unguarded` the child
/// inherits the lock held by a thread that does not exist in it, and blocks.
#[derive(Parser, Debug)]
#[command(name = "forkguard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML file with scenario settings. Flags override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip the fork hooks (negative control: the child is expected to block).
    #[arg(long)]
    pub unguarded: bool,

    /// Number of sequential worker-then-fork rounds.
    #[arg(long)]
    pub rounds: Option<u32>,

    /// How long the worker holds the lock, in milliseconds.
    #[arg(long)]
    pub hold_ms: Option<u64>,

    /// Pause between the worker taking the lock and the fork, in milliseconds.
    #[arg(long)]
    pub fork_delay_ms: Option<u64>,

    /// Bounded wait for the child's acquire, in milliseconds.
    #[arg(long)]
    pub child_timeout_ms: Option<u64>,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Build the scenario configuration from the config file (if any) and flags.
    pub fn scenario_config(&self) -> Result<ScenarioConfig> {
        let mut config = match &self.config {
            Some(path) => ScenarioConfig::load(path)?,
            None => ScenarioConfig::default(),
        };

        if self.unguarded {
            config.guarded = false;
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(hold_ms) = self.hold_ms {
            config.hold_ms = hold_ms;
        }
        if let Some(fork_delay_ms) = self.fork_delay_ms {
            config.fork_delay_ms = fork_delay_ms;
        }
        if let Some(child_timeout_ms) = self.child_timeout_ms {
            config.child_lock_timeout_ms = child_timeout_ms;
            if config.child_exit_timeout_ms <= child_timeout_ms {
                config.child_exit_timeout_ms = child_timeout_ms.saturating_add(CHILD_EXIT_GRACE_MS);
            }
        }

        config.validate()?;
        Ok(config)
    }
}
