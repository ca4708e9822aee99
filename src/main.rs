use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use p4tape::adapter::{self, Endpoint};
use p4tape::cli::{Cli, Commands, route_check, route_replay};

/// Environment variable holding the log filter, e.g. `P4TAPE_LOG=p4tape=debug`.
const LOG_ENV: &str = "P4TAPE_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let endpoint: Result<Box<dyn Endpoint>, anyhow::Error> = match &cli.command {
        Commands::Check(args) => route_check(args, &cwd, std::io::stdin().lock())
            .map(|a| Box::new(a) as Box<dyn Endpoint>),
        Commands::Replay(args) => {
            route_replay(args, &cwd).map(|a| Box::new(a) as Box<dyn Endpoint>)
        }
    };

    let exit_code = match endpoint {
        Ok(endpoint) => adapter::run(endpoint.as_ref()),
        Err(e) => {
            tracing::error!(error = %e, "could not start");
            eprintln!("p4tape: {e}");
            2
        }
    };

    ExitCode::from(exit_code as u8)
}
