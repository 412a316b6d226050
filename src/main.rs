//! Command-line entry point for proteomics sample design inference.
//!
//! Reads a Spectronaut or MaxQuant export from a directory, infers the
//! nested sample design from the column names and either prints it or
//! exports the intensity matrices.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use proteomics_design::cli::{run_cli, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.loglevel.as_str())).init();
    info!("Starting with arguments: {:?}", cli);

    if let Err(e) = run_cli(cli) {
        error!("Run failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
