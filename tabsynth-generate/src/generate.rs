//! The generate workflow: resolve a configuration, run it, write the files.

use std::fmt;
use std::path::{Path, PathBuf};

use tabsynth_core::sink::{
    self, COMPRESSED_SUFFIX, OutputFormat, SinkOptions, ground_truth_path,
};
use tabsynth_core::{DatasetConfig, Result, TabSynthError, pipeline, presets};
use tracing::{debug, info};

use crate::GenerateArgs;

/// What a generate run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateSummary {
    pub dataset: String,
    pub records: usize,
    pub seed: u64,
    pub anomalies: usize,
    pub output: PathBuf,
    pub truth: Option<PathBuf>,
}

impl fmt::Display for GenerateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset generation completed successfully")?;
        writeln!(f, "Dataset: {}", self.dataset)?;
        writeln!(f, "Records: {}", self.records)?;
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(f, "Anomalies: {}", self.anomalies)?;
        write!(f, "Output: {}", self.output.display())?;
        if let Some(truth) = &self.truth {
            write!(f, "\nGround truth: {}", truth.display())?;
        }
        Ok(())
    }
}

/// Loads the configuration named by `--preset` or `--config` and applies the
/// record and seed overrides.
///
/// # Errors
/// Returns a configuration error if neither or an unknown source is given,
/// or if the file cannot be read or parsed.
pub fn resolve_config(args: &GenerateArgs) -> Result<DatasetConfig> {
    let mut config = match (&args.preset, &args.config) {
        (Some(name), None) => presets::preset(name)?,
        (None, Some(path)) => DatasetConfig::from_file(path)?,
        (Some(_), Some(_)) => {
            return Err(TabSynthError::configuration(
                "--preset and --config are mutually exclusive",
            ));
        }
        (None, None) => {
            return Err(TabSynthError::configuration(
                "a dataset is required: use --preset <NAME> or --config <FILE>",
            ));
        }
    };

    if let Some(records) = args.records {
        config = config.with_records(records);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    Ok(config)
}

/// Output path and sink options for a run.
fn resolve_output(args: &GenerateArgs, config: &DatasetConfig) -> (PathBuf, SinkOptions) {
    let format = match (args.format, &args.output) {
        (Some(format), _) => OutputFormat::from(format),
        (None, Some(path)) => OutputFormat::from_path(path),
        (None, None) => OutputFormat::default(),
    };

    let mut output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.{}", config.name, format.extension())));
    if args.compress && !has_compressed_suffix(&output) {
        let mut name = output.into_os_string();
        name.push(COMPRESSED_SUFFIX);
        output = PathBuf::from(name);
    }

    let options = SinkOptions::new(format)
        .with_label_column(args.label_column)
        .with_compression(args.compress);
    (output, options)
}

fn has_compressed_suffix(path: &Path) -> bool {
    path.to_string_lossy().ends_with(COMPRESSED_SUFFIX)
}

/// Runs the full workflow and writes the dataset and its ground truth.
///
/// # Errors
/// Returns the first configuration, injection or sink error. A failed run
/// writes nothing.
pub fn run_generate(args: &GenerateArgs) -> Result<GenerateSummary> {
    let config = resolve_config(args)?;
    let (output, options) = resolve_output(args, &config);

    info!("Starting dataset generation...");
    info!("Dataset: {}", config.name);
    info!("Output: {}", output.display());
    debug!("Sink options: {:?}", options);

    let truth = if args.no_truth {
        None
    } else {
        Some(
            args.truth
                .clone()
                .unwrap_or_else(|| ground_truth_path(&output)),
        )
    };

    let run = pipeline::run(&config)?;
    sink::write_dataset_with_truth(
        &run.dataset,
        &run.ground_truth,
        &output,
        truth.as_deref(),
        &options,
    )?;

    info!("✓ Dataset saved to {}", output.display());
    Ok(GenerateSummary {
        dataset: config.name,
        records: run.dataset.len(),
        seed: config.seed,
        anomalies: run.ground_truth.len(),
        output,
        truth,
    })
}
