mod route;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use route::{route_check, route_replay};

#[derive(Parser)]
#[command(name = "p4tape", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub enum Commands {
    /// Check whether P4 command lines are valid
    Check(CheckArgs),
    /// Replay one chapter visit from a fixture and print the resulting state
    Replay(ReplayArgs),
}

#[derive(clap::Args)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct CheckArgs {
    /// Command line to check (skips stdin)
    #[arg(long, conflicts_with = "fixture")]
    pub command: Option<String>,

    /// Check every sequence line of a fixture file
    #[arg(long)]
    pub fixture: Option<PathBuf>,
}

#[derive(clap::Args)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct ReplayArgs {
    /// Fixture file (defaults to p4tape.yml or p4tape.yaml in the current directory)
    #[arg(long)]
    pub fixture: Option<PathBuf>,
}
