//! Synthetic dataset generation tool.
//!
//! This binary generates a seeded base population from a preset or a JSON
//! configuration, injects the configured anomalies and writes the table
//! plus its ground truth.
//!
//! # Guarantees
//! - Same configuration and seed give byte-identical output
//! - Output files are written whole or not at all
//! - No network access

use clap::Parser;
use tabsynth_core::{Result, logging::init_logging};
use tabsynth_generate::{Cli, execute_cli};
use tracing::error;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet)?;

    let text = execute_cli(&cli).map_err(|e| {
        error!("Generation failed: {}", e);
        e
    })?;
    println!("{}", text);
    Ok(())
}
