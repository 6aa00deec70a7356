//! Detection configuration.
//!
//! Selects which detector scores a dataset and how aggressively the
//! statistical detector flags outliers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outlier detection sensitivity level.
///
/// Controls how many standard deviations from the mean a value
/// must be to be considered an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySensitivity {
    /// 3.0 standard deviations - fewer false positives
    Low,
    /// 2.5 standard deviations - balanced detection
    #[default]
    Medium,
    /// 2.0 standard deviations - more aggressive detection
    High,
}

impl AnomalySensitivity {
    /// Returns the z-score threshold for this sensitivity level.
    pub fn z_score_threshold(&self) -> f64 {
        match self {
            AnomalySensitivity::Low => 3.0,
            AnomalySensitivity::Medium => 2.5,
            AnomalySensitivity::High => 2.0,
        }
    }
}

/// Which detector to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Per-column z-score outliers
    #[default]
    ZScore,
    /// Declared bound violations
    Bounds,
}

/// Detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Detector to run
    pub detector: DetectorKind,
    /// Sensitivity of the z-score detector
    pub sensitivity: AnomalySensitivity,
    /// Numeric columns to skip, such as identifiers stored as numbers
    #[serde(default)]
    pub exclude_columns: Vec<String>,
}

/// Validation errors for detection configuration.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("column '{0}' is excluded more than once")]
    DuplicateExclusion(String),
    #[error("column name to exclude is empty")]
    EmptyExclusion,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::ZScore,
            sensitivity: AnomalySensitivity::Medium,
            exclude_columns: Vec::new(),
        }
    }
}

impl DetectionConfig {
    /// Creates a new detection config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to select the detector.
    pub fn with_detector(mut self, detector: DetectorKind) -> Self {
        self.detector = detector;
        self
    }

    /// Builder method to set sensitivity level.
    pub fn with_sensitivity(mut self, sensitivity: AnomalySensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Builder method to skip a column.
    pub fn with_excluded_column(mut self, column: impl Into<String>) -> Self {
        self.exclude_columns.push(column.into());
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (index, column) in self.exclude_columns.iter().enumerate() {
            if column.trim().is_empty() {
                return Err(ConfigValidationError::EmptyExclusion);
            }
            if self.exclude_columns[..index].contains(column) {
                return Err(ConfigValidationError::DuplicateExclusion(column.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_sensitivity_z_scores() {
        assert_eq!(AnomalySensitivity::Low.z_score_threshold(), 3.0);
        assert_eq!(AnomalySensitivity::Medium.z_score_threshold(), 2.5);
        assert_eq!(AnomalySensitivity::High.z_score_threshold(), 2.0);
    }

    #[test]
    fn test_default_config() {
        let config = DetectionConfig::default();
        assert_eq!(config.detector, DetectorKind::ZScore);
        assert_eq!(config.sensitivity, AnomalySensitivity::Medium);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = DetectionConfig::new()
            .with_detector(DetectorKind::Bounds)
            .with_sensitivity(AnomalySensitivity::High)
            .with_excluded_column("order_hour");
        assert_eq!(config.detector, DetectorKind::Bounds);
        assert_eq!(config.sensitivity, AnomalySensitivity::High);
        assert_eq!(config.exclude_columns, vec!["order_hour"]);
    }

    #[test]
    fn test_validate_rejects_duplicate_exclusion() {
        let config = DetectionConfig::new()
            .with_excluded_column("quantity")
            .with_excluded_column("quantity");
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::DuplicateExclusion(ref c)) if c == "quantity"
        ));

        let config = DetectionConfig::new().with_excluded_column(" ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DetectionConfig::default()).unwrap();
        assert!(json.contains("\"z_score\""));
        assert!(json.contains("\"medium\""));
    }
}
