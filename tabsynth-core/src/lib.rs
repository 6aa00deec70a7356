//! Core data structures and engines for tabsynth.
//!
//! This crate provides the types and operations shared between the
//! generator and post-processor binaries: dataset configuration, the seeded
//! base population generator, the anomaly injector with its ground truth,
//! the delimited-file sink, and the bound checks and detector scoring used
//! to verify what was injected.
//!
//! # Reproducibility
//! - All randomness flows from one caller-owned `StdRng`
//! - Identical configuration and seed produce byte-identical files
//! - Ground truth carries no timestamps
//!
//! # Example
//! ```rust,no_run
//! use tabsynth_core::{pipeline, presets};
//!
//! let config = presets::preset("real-estate")?;
//! let output = pipeline::run(&config)?;
//! assert_eq!(output.ground_truth.len(), 20);
//! # Ok::<(), tabsynth_core::TabSynthError>(())
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod injector;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod presets;
pub mod quality;
pub mod sink;

// Re-export commonly used types
pub use config::{
    AnomalyCatalog, AnomalyConfig, AnomalyKind, DatasetConfig, DerivedRule, FieldSource,
    FieldSpec, KindAssignment, Mutation, TargetSelection, WeightedOption,
};
pub use error::{Result, TabSynthError};
pub use generator::Generator;
pub use injector::Injector;
pub use models::{AnomalyMark, Column, Dataset, FieldKind, GroundTruth, Record, Value};
pub use pipeline::{RunOutput, run};
pub use sink::{OutputFormat, SinkOptions};
