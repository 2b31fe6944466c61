//! gridinv CLI Binary
//!
//! Offline inspection of inventory caches and task-inventory dumps.

use anyhow::Context;
use clap::Parser;
use gridinv::tooling::cli::{Cli, CliContext};
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    let context = CliContext::new(cli.config.clone()).context("Error loading configuration")?;
    context
        .init_logging(cli)
        .context("Error initializing logging")?;
    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
