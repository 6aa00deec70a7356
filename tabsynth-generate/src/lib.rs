//! Library module for tabsynth-generate
//!
//! This module exposes the CLI definition and command execution for testing
//! purposes. The binary entry point is in main.rs.

pub mod generate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tabsynth_core::{Result, presets, sink::OutputFormat};

/// CLI argument structure
#[derive(Parser, Debug)]
#[command(name = "tabsynth-generate")]
#[command(about = "Synthetic tabular dataset generator with injected anomalies")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "
tabsynth-generate - Seeded synthetic datasets with labelled anomalies

Generates a base population of records from field distributions, injects a
catalog of anomalies into a subset of rows, and writes the table as CSV or
TSV together with a JSON ground-truth sidecar.

The same configuration and seed always produce byte-identical files.

EXAMPLES:
  tabsynth-generate --preset real-estate
  tabsynth-generate --preset school --records 500 --seed 7 -o school.tsv
  tabsynth-generate --config fixtures.json --label-column
  tabsynth-generate config ecommerce > ecommerce.json
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Generation arguments used when no subcommand is given
    #[command(flatten)]
    pub generate: GenerateArgs,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a dataset (the default)
    Generate(GenerateArgs),
    /// List the built-in presets
    Presets,
    /// Print the JSON configuration of a preset
    Config {
        /// Preset name
        #[arg(value_name = "PRESET")]
        preset: String,
    },
}

/// Delimited output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Tsv => OutputFormat::Tsv,
        }
    }
}

/// Arguments of the generate command
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Built-in preset to generate
    #[arg(long, value_name = "NAME", conflicts_with = "config")]
    pub preset: Option<String>,

    /// JSON dataset configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of records, overriding the configuration
    #[arg(short = 'n', long)]
    pub records: Option<usize>,

    /// Random seed, overriding the configuration
    #[arg(long, env = "TABSYNTH_SEED")]
    pub seed: Option<u64>,

    /// Output file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Output file path (.csv, .tsv, optionally .zst); defaults to <dataset>.csv"
    )]
    pub output: Option<PathBuf>,

    /// Output format, inferred from the output path when omitted
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Append an anomaly_kind column with the injected kind of each row
    #[arg(long)]
    pub label_column: bool,

    /// Enable compression
    #[arg(long, help = "Compress output using Zstandard (.zst)")]
    pub compress: bool,

    /// Ground-truth sidecar path
    #[arg(long, value_name = "FILE", conflicts_with = "no_truth")]
    pub truth: Option<PathBuf>,

    /// Skip writing the ground-truth sidecar
    #[arg(long)]
    pub no_truth: bool,
}

/// Logging flags shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(
        short,
        long,
        global = true,
        help = "Suppress all output except errors"
    )]
    pub quiet: bool,
}

/// Executes the parsed command and returns the text to print.
///
/// # Errors
///
/// Returns configuration errors for unknown presets or invalid
/// configurations, and I/O errors from the sink. No output file is left
/// behind on failure.
pub fn execute_cli(cli: &Cli) -> Result<String> {
    match &cli.command {
        Some(Command::Generate(args)) => generate::run_generate(args).map(|s| s.to_string()),
        Some(Command::Presets) => Ok(list_presets()),
        Some(Command::Config { preset }) => presets::preset(preset)?.to_json_pretty(),
        None => generate::run_generate(&cli.generate).map(|s| s.to_string()),
    }
}

/// Lists the built-in presets, one per line.
pub fn list_presets() -> String {
    let width = presets::PRESETS
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or_default();
    presets::PRESETS
        .iter()
        .map(|p| format!("{:width$}  {}", p.name, p.description, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}
