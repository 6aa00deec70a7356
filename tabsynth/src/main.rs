//! Synthetic dataset post-processing tool
//!
//! This tool reads a dataset written by tabsynth-generate together with its
//! ground truth, checks the injected anomalies against the declared bounds
//! and scores anomaly detectors against the labels.

mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tabsynth_core::quality::{
    AnomalySensitivity, Detection, DetectionConfig, DetectionScore, DetectorKind, declared_bounds,
    detector_for, evaluate, verify_ground_truth,
};
use tabsynth_core::sink::{OutputFormat, ground_truth_path, read_dataset, read_ground_truth};
use tabsynth_core::{DatasetConfig, Dataset, GroundTruth, logging::init_logging, presets};
use tracing::{info, warn};

use crate::report::Description;

/// Command-line interface for the post-processor
#[derive(Parser)]
#[command(name = "tabsynth")]
#[command(about = "Ground-truth verification and detector scoring for synthetic datasets")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the post-processor
#[derive(Subcommand)]
pub enum Commands {
    /// Check that every marked row breaks a declared bound and no clean row does
    Verify {
        #[command(flatten)]
        input: InputArgs,

        /// Exit with an error if bounds and ground truth disagree
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        report: ReportArgs,
    },
    /// Score an anomaly detector against the ground truth
    Evaluate {
        #[command(flatten)]
        input: InputArgs,

        /// Detector to score
        #[arg(long, value_enum, default_value = "z-score")]
        detector: DetectorArg,

        /// Z-score detector sensitivity
        #[arg(long, value_enum, default_value = "medium")]
        sensitivity: SensitivityArg,

        /// Numeric columns the z-score detector skips
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        #[command(flatten)]
        report: ReportArgs,
    },
    /// Describe a configuration: columns, declared bounds and anomaly kinds
    Describe {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        report: ReportArgs,
    },
}

/// Where the dataset configuration comes from
#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Built-in preset the dataset was generated from
    #[arg(long, value_name = "NAME", conflicts_with = "config")]
    pub preset: Option<String>,

    /// JSON configuration the dataset was generated from
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// A written dataset and its ground truth
#[derive(Args, Clone, Debug)]
pub struct InputArgs {
    /// Dataset file (.csv, .tsv, optionally .zst)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Ground-truth sidecar, defaults to <input>.truth.json
    #[arg(long, value_name = "FILE")]
    pub truth: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Report format and destination
#[derive(Args, Clone, Debug)]
pub struct ReportArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "markdown")]
    pub format: ReportFormat,

    /// Output file path, stdout when omitted
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

/// Logging flags shared by every command
#[derive(Args)]
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
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

/// Available report formats
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// Markdown documentation
    Markdown,
    /// JSON structured output
    Json,
}

/// Detector choices
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorArg {
    /// Per-column z-score outliers
    ZScore,
    /// Declared bound violations
    Bounds,
}

/// Sensitivity choices
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensitivityArg {
    /// 3.0 standard deviations
    Low,
    /// 2.5 standard deviations
    Medium,
    /// 2.0 standard deviations
    High,
}

impl From<DetectorArg> for DetectorKind {
    fn from(arg: DetectorArg) -> Self {
        match arg {
            DetectorArg::ZScore => DetectorKind::ZScore,
            DetectorArg::Bounds => DetectorKind::Bounds,
        }
    }
}

impl From<SensitivityArg> for AnomalySensitivity {
    fn from(arg: SensitivityArg) -> Self {
        match arg {
            SensitivityArg::Low => AnomalySensitivity::Low,
            SensitivityArg::Medium => AnomalySensitivity::Medium,
            SensitivityArg::High => AnomalySensitivity::High,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Commands::Verify {
            input,
            strict,
            report,
        } => verify(input, *strict, report),
        Commands::Evaluate {
            input,
            detector,
            sensitivity,
            exclude,
            report,
        } => {
            let mut config = DetectionConfig::new()
                .with_detector((*detector).into())
                .with_sensitivity((*sensitivity).into());
            for column in exclude {
                config = config.with_excluded_column(column.clone());
            }
            score(input, &config, report)
        }
        Commands::Describe { source, report } => describe(source, report),
    }
}

/// Loads the configuration named by `--preset` or `--config`.
fn load_config(source: &SourceArgs) -> anyhow::Result<DatasetConfig> {
    let config = match (&source.preset, &source.config) {
        (Some(name), _) => presets::preset(name)?,
        (None, Some(path)) => DatasetConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        (None, None) => bail!("a dataset configuration is required: use --preset or --config"),
    };
    config.validate()?;
    Ok(config)
}

/// Loads a dataset, its ground truth and its configuration.
fn load_input(input: &InputArgs) -> anyhow::Result<(DatasetConfig, Dataset, GroundTruth)> {
    let config = load_config(&input.source)?;
    let format = OutputFormat::from_path(&input.input);
    let dataset = read_dataset(&input.input, &config.columns(), format)
        .with_context(|| format!("Failed to read dataset {}", input.input.display()))?;

    let truth_path = input
        .truth
        .clone()
        .unwrap_or_else(|| ground_truth_path(&input.input));
    let truth = read_ground_truth(&truth_path)
        .with_context(|| format!("Failed to read ground truth {}", truth_path.display()))?;
    truth.check_rows(dataset.len()).with_context(|| {
        format!(
            "Ground truth {} does not belong to {}",
            truth_path.display(),
            input.input.display()
        )
    })?;

    if truth.seed.is_some_and(|seed| seed != config.seed) {
        warn!(
            "Ground truth seed {:?} differs from configuration seed {}",
            truth.seed, config.seed
        );
    }
    info!(
        "Loaded {} records and {} anomalies from {}",
        dataset.len(),
        truth.len(),
        input.input.display()
    );
    Ok((config, dataset, truth))
}

fn verify(input: &InputArgs, strict: bool, args: &ReportArgs) -> anyhow::Result<()> {
    let (config, dataset, truth) = load_input(input)?;
    let rules = declared_bounds(&config);
    let report = verify_ground_truth(&dataset, &truth, &rules)?;

    let text = match args.format {
        ReportFormat::Markdown => report::verification_markdown(&report),
        ReportFormat::Json => to_json(&report)?,
    };
    emit(&text, args.output.as_deref())?;

    if strict && !report.is_consistent() {
        bail!(
            "ground truth disagrees with the declared bounds: {} marked rows within bounds, {} unmarked rows breaking a bound",
            report.marked_without_violation.len(),
            report.unmarked_with_violation.len()
        );
    }
    Ok(())
}

/// JSON body of an evaluation report.
#[derive(Serialize)]
struct Evaluation<'a> {
    score: &'a DetectionScore,
    detection: &'a Detection,
}

fn score(input: &InputArgs, config: &DetectionConfig, args: &ReportArgs) -> anyhow::Result<()> {
    config.validate()?;
    let (dataset_config, dataset, truth) = load_input(input)?;
    let detector = detector_for(config, declared_bounds(&dataset_config));
    let detection = detector.detect(&dataset);
    let score = evaluate(&detection, &truth);
    info!(
        "{}: precision {:.3}, recall {:.3}, F1 {:.3}",
        score.detector, score.precision, score.recall, score.f1
    );

    let text = match args.format {
        ReportFormat::Markdown => report::score_markdown(&score, &detection),
        ReportFormat::Json => to_json(&Evaluation {
            score: &score,
            detection: &detection,
        })?,
    };
    emit(&text, args.output.as_deref())
}

fn describe(source: &SourceArgs, args: &ReportArgs) -> anyhow::Result<()> {
    let config = load_config(source)?;
    let description = Description::new(&config, &declared_bounds(&config));
    let text = match args.format {
        ReportFormat::Markdown => report::description_markdown(&description),
        ReportFormat::Json => to_json(&description)?,
    };
    emit(&text, args.output.as_deref())
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}

/// Writes the report to a file, or to stdout.
fn emit(text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("✓ Report saved to {}", path.display());
        }
        None => println!("{}", text.trim_end()),
    }
    Ok(())
}
