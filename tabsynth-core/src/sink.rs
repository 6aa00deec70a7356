//! Delimited file output and read-back.
//!
//! A dataset is written as one CSV or TSV file with a header row in column
//! order, optionally followed by an `anomaly_kind` label column. Files are
//! written to a temporary file in the destination directory and renamed
//! into place, so a failed run never leaves a partial output.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, TabSynthError};
use crate::models::{Column, Dataset, GroundTruth, Record};

/// Name of the optional label column.
pub const LABEL_COLUMN: &str = "anomaly_kind";

/// Suffix of compressed outputs.
pub const COMPRESSED_SUFFIX: &str = ".zst";

/// Delimited file flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Tab-separated values
    Tsv,
}

impl OutputFormat {
    /// Field delimiter byte.
    pub fn delimiter(self) -> u8 {
        match self {
            OutputFormat::Csv => b',',
            OutputFormat::Tsv => b'\t',
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
        }
    }

    /// Infers the format from a path, ignoring a trailing `.zst`.
    pub fn from_path(path: &Path) -> Self {
        let name = path.to_string_lossy();
        let name = name.strip_suffix(COMPRESSED_SUFFIX).unwrap_or(&name);
        if name.ends_with(".tsv") || name.ends_with(".tab") {
            OutputFormat::Tsv
        } else {
            OutputFormat::Csv
        }
    }
}

/// How a dataset is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SinkOptions {
    pub format: OutputFormat,
    /// Append the `anomaly_kind` column from the ground truth
    pub label_column: bool,
    /// Compress the file with zstd
    pub compress: bool,
}

impl SinkOptions {
    /// Creates options for a format.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Builder method to toggle the label column.
    pub fn with_label_column(mut self, enabled: bool) -> Self {
        self.label_column = enabled;
        self
    }

    /// Builder method to toggle compression.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

/// Renders a dataset as delimited bytes.
///
/// # Errors
/// Returns a configuration error if the label column is requested but a
/// column already uses its name.
pub fn encode_dataset(
    dataset: &Dataset,
    truth: Option<&GroundTruth>,
    options: &SinkOptions,
) -> Result<Vec<u8>> {
    if options.label_column && dataset.column(LABEL_COLUMN).is_some() {
        return Err(TabSynthError::configuration(format!(
            "column '{}' clashes with the label column",
            LABEL_COLUMN
        )));
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.format.delimiter())
        .from_writer(Vec::new());

    let mut header: Vec<&str> = dataset.columns().iter().map(|c| c.name.as_str()).collect();
    if options.label_column {
        header.push(LABEL_COLUMN);
    }
    writer
        .write_record(&header)
        .map_err(|e| TabSynthError::csv("Failed to write header", e))?;

    for (row, record) in dataset.records().iter().enumerate() {
        let mut cells = render_record(dataset.columns(), record);
        if options.label_column {
            let label = truth.and_then(|t| t.kind_of(row)).unwrap_or_default();
            cells.push(label.to_string());
        }
        writer
            .write_record(&cells)
            .map_err(|e| TabSynthError::csv(format!("Failed to write row {}", row), e))?;
    }

    writer
        .into_inner()
        .map_err(|e| TabSynthError::io("Failed to flush delimited output", e.into_error()))
}

fn render_record(columns: &[Column], record: &Record) -> Vec<String> {
    columns
        .iter()
        .map(|c| {
            record
                .get(&c.name)
                .map(|v| c.kind.render(v))
                .unwrap_or_default()
        })
        .collect()
}

/// Writes a dataset to `path` atomically.
pub fn write_dataset(
    dataset: &Dataset,
    truth: Option<&GroundTruth>,
    path: &Path,
    options: &SinkOptions,
) -> Result<()> {
    let bytes = dataset_bytes(dataset, truth, options)?;
    persist(&bytes, path)?;
    info!(
        "Wrote {} records to {} ({} bytes)",
        dataset.len(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Writes a dataset together with its ground-truth sidecar at `truth_path`,
/// or alone when `truth_path` is `None`.
///
/// Both files are staged before either is moved into place, and the dataset
/// is removed again if the sidecar cannot be moved, so a failed call leaves
/// no dataset without its sidecar.
pub fn write_dataset_with_truth(
    dataset: &Dataset,
    truth: &GroundTruth,
    path: &Path,
    truth_path: Option<&Path>,
    options: &SinkOptions,
) -> Result<()> {
    let bytes = dataset_bytes(dataset, Some(truth), options)?;
    let staged_dataset = stage(&bytes, path)?;
    let staged_truth = match truth_path {
        Some(truth_path) => Some((stage(truth_json(truth)?.as_bytes(), truth_path)?, truth_path)),
        None => None,
    };

    commit(staged_dataset, path)?;
    if let Some((staged, truth_path)) = staged_truth {
        if let Err(error) = commit(staged, truth_path) {
            if let Err(cleanup) = std::fs::remove_file(path) {
                warn!("Failed to remove {}: {}", path.display(), cleanup);
            }
            return Err(error);
        }
        info!(
            "Wrote ground truth for {} anomalies to {}",
            truth.len(),
            truth_path.display()
        );
    }
    info!(
        "Wrote {} records to {} ({} bytes)",
        dataset.len(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

/// Encoded and, if requested, compressed dataset bytes.
fn dataset_bytes(
    dataset: &Dataset,
    truth: Option<&GroundTruth>,
    options: &SinkOptions,
) -> Result<Vec<u8>> {
    let bytes = encode_dataset(dataset, truth, options)?;
    if options.compress {
        compress(&bytes)
    } else {
        Ok(bytes)
    }
}

#[cfg(feature = "compression")]
fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)
        .map_err(|e| TabSynthError::io("Failed to create compressor", e))?;
    encoder
        .write_all(bytes)
        .map_err(|e| TabSynthError::io("Compression failed", e))?;
    encoder
        .finish()
        .map_err(|e| TabSynthError::io("Compression finalization failed", e))
}

#[cfg(not(feature = "compression"))]
fn compress(_bytes: &[u8]) -> Result<Vec<u8>> {
    Err(TabSynthError::configuration(
        "Compression not available. Compile with --features compression",
    ))
}

#[cfg(feature = "compression")]
fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(bytes).map_err(|e| TabSynthError::io("Decompression failed", e))
}

#[cfg(not(feature = "compression"))]
fn decompress(_bytes: &[u8]) -> Result<Vec<u8>> {
    Err(TabSynthError::configuration(
        "Compressed input not supported. Compile with --features compression",
    ))
}

/// Writes bytes through a temporary file in the destination directory.
fn persist(bytes: &[u8], path: &Path) -> Result<()> {
    commit(stage(bytes, path)?, path)
}

/// Writes and syncs bytes into a temporary file next to `path`. The file is
/// deleted when dropped uncommitted.
fn stage(bytes: &[u8], path: &Path) -> Result<tempfile::NamedTempFile> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(directory).map_err(|e| {
        TabSynthError::io(
            format!("Failed to create temporary file in {}", directory.display()),
            e,
        )
    })?;
    temp.write_all(bytes)
        .map_err(|e| TabSynthError::io(format!("Failed to write {}", path.display()), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| TabSynthError::io(format!("Failed to sync {}", path.display()), e))?;
    Ok(temp)
}

/// Renames a staged file onto `path`.
fn commit(temp: tempfile::NamedTempFile, path: &Path) -> Result<()> {
    temp.persist(path)
        .map_err(|e| TabSynthError::io(format!("Failed to rename into {}", path.display()), e.error))?;
    debug!("Persisted {}", path.display());
    Ok(())
}

/// Default sidecar path: `<output>.truth.json`.
pub fn ground_truth_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".truth.json");
    PathBuf::from(name)
}

/// Writes the ground truth as pretty JSON, atomically.
pub fn write_ground_truth(truth: &GroundTruth, path: &Path) -> Result<()> {
    persist(truth_json(truth)?.as_bytes(), path)?;
    info!(
        "Wrote ground truth for {} anomalies to {}",
        truth.len(),
        path.display()
    );
    Ok(())
}

fn truth_json(truth: &GroundTruth) -> Result<String> {
    let mut json = serde_json::to_string_pretty(truth)
        .map_err(|e| TabSynthError::serialization("Failed to serialize ground truth", e))?;
    json.push('\n');
    Ok(json)
}

/// Reads a ground-truth sidecar.
pub fn read_ground_truth(path: &Path) -> Result<GroundTruth> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| TabSynthError::io(format!("Failed to read {}", path.display()), e))?;
    serde_json::from_str(&text).map_err(|e| {
        TabSynthError::serialization(format!("Failed to parse {}", path.display()), e)
    })
}

/// Parses delimited bytes back into a dataset using the column kinds.
///
/// Columns are matched by header name; extra columns such as the label
/// column are ignored.
pub fn decode_dataset(
    bytes: &[u8],
    name: &str,
    columns: &[Column],
    format: OutputFormat,
) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .from_reader(bytes);
    let header = reader
        .headers()
        .map_err(|e| TabSynthError::csv("Failed to read header", e))?
        .clone();

    let mut positions = Vec::with_capacity(columns.len());
    for column in columns {
        let position = header.iter().position(|h| h == column.name).ok_or_else(|| {
            TabSynthError::Parse {
                context: format!("header has no column '{}'", column.name),
            }
        })?;
        positions.push(position);
    }

    let mut dataset = Dataset::new(name, columns.to_vec());
    for (row, result) in reader.records().enumerate() {
        let cells = result.map_err(|e| TabSynthError::csv(format!("Failed to read row {}", row), e))?;
        let mut record = Record::new();
        for (column, position) in columns.iter().zip(&positions) {
            let raw = cells.get(*position).unwrap_or_default();
            let value = column
                .kind
                .parse(&column.name, raw)
                .map_err(|_| TabSynthError::parse_cell(row, &column.name, raw))?;
            record.set(column.name.clone(), value);
        }
        dataset.push(record)?;
    }
    Ok(dataset)
}

/// Reads a written dataset back; `.zst` files are decompressed first.
pub fn read_dataset(path: &Path, columns: &[Column], format: OutputFormat) -> Result<Dataset> {
    let bytes = std::fs::read(path)
        .map_err(|e| TabSynthError::io(format!("Failed to read {}", path.display()), e))?;
    let bytes = if path.to_string_lossy().ends_with(COMPRESSED_SUFFIX) {
        decompress(&bytes)?
    } else {
        bytes
    };
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dataset = decode_dataset(&bytes, &name, columns, format)?;
    debug!("Read {} records from {}", dataset.len(), path.display());
    Ok(dataset)
}
