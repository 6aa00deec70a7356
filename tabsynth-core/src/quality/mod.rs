//! Bound checking and anomaly detection scoring.
//!
//! This module provides:
//! - **Bounds**: the "normal" rules implied by a dataset configuration
//! - **Verification**: ground truth compared with bound violations
//! - **Detection**: z-score and bounds detectors
//! - **Evaluation**: precision, recall and F1 of a detector
//!
//! # Example
//! ```rust,ignore
//! use tabsynth_core::quality::{declared_bounds, verify_ground_truth};
//!
//! let rules = declared_bounds(&config);
//! let report = verify_ground_truth(&dataset, &truth, &rules)?;
//! assert!(report.is_consistent());
//! ```

mod bounds;
mod config;
mod detector;
mod evaluation;
mod models;

// Re-export public API
pub use bounds::{BoundRule, check_dataset, declared_bounds, verify_ground_truth};
pub use config::{AnomalySensitivity, ConfigValidationError, DetectionConfig, DetectorKind};
pub use detector::{BoundsDetector, Detector, ZScoreDetector, detector_for};
pub use evaluation::evaluate;
pub use models::{
    BoundViolation, ColumnAnomaly, Detection, DetectionScore, KindRecall, VerificationReport,
};
