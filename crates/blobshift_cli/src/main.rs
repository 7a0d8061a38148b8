mod cli;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, exit_code, run};

fn init_tracing(if_verbose: bool) -> Result<()> {
    let filter = if if_verbose {
        EnvFilter::try_new("debug").context("building debug log filter")?
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .context("building log filter")?
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initializing tracing: {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli, Path::new(".")) {
        Ok(report) => {
            info!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e.code();
            error!(code = %code, "{e}");
            ExitCode::from(exit_code(code))
        }
    }
}
