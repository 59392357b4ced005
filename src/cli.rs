//! The CLI entry point (C9): subcommands for running a suite, dry-running
//! it, and listing discovered cases, in the style of the host binaries in
//! the example pack (`clap::Parser`, repeatable `-v`).

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Integration test harness for a networked database server.
#[derive(Parser, Debug)]
#[command(name = "miniob-test-harness", version, about)]
pub struct HarnessCli {
    /// Verbosity level (repeatable: -v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the harness TOML configuration file.
    #[arg(short, long, global = true, default_value = "harness.toml")]
    pub config: PathBuf,

    /// Write a machine-readable JSON summary to this path.
    #[arg(long, global = true)]
    pub report_json: Option<PathBuf>,

    #[command(subcommand)]
    pub command: HarnessCommand,
}

#[derive(Subcommand, Debug)]
pub enum HarnessCommand {
    /// Run the full suite, or a named subset.
    Run {
        /// Run only these case names (may be repeated); default is all cases.
        #[arg(long = "case")]
        cases: Vec<String>,
    },
    /// Validate every case's shape against a mocked client/supervisor.
    Dryrun,
    /// Print discovered case names, one per line, sorted.
    List,
}

/// Translate `-v` repeat count into a `tracing_subscriber` filter: 0 is
/// warnings and above, each additional `-v` drops one level.
pub fn verbosity_filter(level: u8) -> EnvFilter {
    let directive = match level {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}
