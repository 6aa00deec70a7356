//! Anomaly detectors scored against the ground truth.
//!
//! The z-score detector looks only at the data; the bounds detector knows
//! the declared rules and serves as the reference the injected anomalies
//! are built against.

use tracing::debug;

use super::bounds::{BoundRule, check_dataset};
use super::config::{AnomalySensitivity, DetectionConfig, DetectorKind};
use super::models::{ColumnAnomaly, Detection};
use crate::models::Dataset;

/// Flags suspicious rows of a dataset.
pub trait Detector {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Returns the flagged rows.
    fn detect(&self, dataset: &Dataset) -> Detection;
}

/// Flags rows where any numeric column lies more than the sensitivity
/// threshold away from the column mean, in population standard deviations.
#[derive(Debug, Clone, Default)]
pub struct ZScoreDetector {
    sensitivity: AnomalySensitivity,
    exclude_columns: Vec<String>,
}

impl ZScoreDetector {
    /// Creates a detector with the given sensitivity.
    pub fn new(sensitivity: AnomalySensitivity) -> Self {
        Self {
            sensitivity,
            exclude_columns: Vec::new(),
        }
    }

    /// Builder method to skip columns.
    pub fn with_excluded_columns(mut self, columns: Vec<String>) -> Self {
        self.exclude_columns = columns;
        self
    }
}

impl Detector for ZScoreDetector {
    fn name(&self) -> &'static str {
        "z_score"
    }

    fn detect(&self, dataset: &Dataset) -> Detection {
        let z_threshold = self.sensitivity.z_score_threshold();
        let mut detection = Detection::new(self.name());

        for column in dataset.columns() {
            if !column.kind.is_numeric() || self.exclude_columns.contains(&column.name) {
                continue;
            }

            let values: Vec<(usize, f64)> = dataset
                .numeric_column(&column.name)
                .into_iter()
                .enumerate()
                .filter_map(|(row, value)| value.filter(|v| v.is_finite()).map(|v| (row, v)))
                .collect();

            // Need at least 3 values for meaningful statistics
            if values.len() < 3 {
                continue;
            }

            let numbers: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
            let (mean, std_dev) = calculate_statistics(&numbers);

            // All values nearly identical
            if std_dev < 1e-10 {
                continue;
            }

            let mut outlier_count = 0;
            for (row, value) in &values {
                if (value - mean).abs() / std_dev > z_threshold {
                    detection.flagged.insert(*row);
                    outlier_count += 1;
                }
            }

            if outlier_count > 0 {
                debug!(
                    "{} outliers in '{}' (mean {:.2}, std_dev {:.2})",
                    outlier_count, column.name, mean, std_dev
                );
                detection.columns.push(ColumnAnomaly {
                    column_name: column.name.clone(),
                    outlier_count,
                    z_score_threshold: z_threshold,
                    mean,
                    std_dev,
                });
            }
        }
        detection
    }
}

/// Calculates mean and population standard deviation for a set of values.
fn calculate_statistics(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    (mean, variance.sqrt())
}

/// Flags rows that break any declared bound.
#[derive(Debug, Clone)]
pub struct BoundsDetector {
    rules: Vec<BoundRule>,
}

impl BoundsDetector {
    /// Creates a detector over the given rules.
    pub fn new(rules: Vec<BoundRule>) -> Self {
        Self { rules }
    }
}

impl Detector for BoundsDetector {
    fn name(&self) -> &'static str {
        "bounds"
    }

    fn detect(&self, dataset: &Dataset) -> Detection {
        let mut detection = Detection::new(self.name());
        detection.flagged = check_dataset(dataset, &self.rules)
            .into_iter()
            .map(|v| v.row)
            .collect();
        detection
    }
}

/// Builds the detector a configuration selects.
///
/// `rules` are only used by the bounds detector.
pub fn detector_for(config: &DetectionConfig, rules: Vec<BoundRule>) -> Box<dyn Detector> {
    match config.detector {
        DetectorKind::ZScore => Box::new(
            ZScoreDetector::new(config.sensitivity)
                .with_excluded_columns(config.exclude_columns.clone()),
        ),
        DetectorKind::Bounds => Box::new(BoundsDetector::new(rules)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{Column, FieldKind, Record, Value};

    fn dataset(values: &[i64]) -> Dataset {
        let columns = vec![
            Column::new("id", FieldKind::Identifier),
            Column::new("value", FieldKind::Integer),
        ];
        let mut dataset = Dataset::new("test", columns);
        for (i, v) in values.iter().enumerate() {
            let mut record = Record::new();
            record.set("id", Value::Text(format!("R{}", i)));
            record.set("value", Value::Integer(*v));
            dataset.push(record).unwrap();
        }
        dataset
    }

    #[test]
    fn test_no_outliers() {
        let detection = ZScoreDetector::default().detect(&dataset(&[50, 52, 48, 51, 49]));
        assert!(detection.flagged.is_empty());
        assert!(detection.columns.is_empty());
    }

    #[test]
    fn test_extreme_outlier_flagged() {
        let mut values = vec![10; 9];
        values.push(1000);
        let detection = ZScoreDetector::default().detect(&dataset(&values));
        assert_eq!(detection.flagged.iter().copied().collect::<Vec<_>>(), vec![9]);
        assert_eq!(detection.columns[0].column_name, "value");
        assert_eq!(detection.columns[0].outlier_count, 1);
    }

    #[test]
    fn test_sensitivity_levels() {
        // z of the last value is sqrt(5), about 2.236
        let values = [10, 10, 10, 10, 10, 25];
        let detect = |sensitivity| ZScoreDetector::new(sensitivity).detect(&dataset(&values));

        let high = detect(AnomalySensitivity::High);
        assert_eq!(high.flagged.iter().copied().collect::<Vec<_>>(), vec![5]);
        assert_eq!(high.columns.len(), 1);
        assert!((high.columns[0].std_dev - 31.25f64.sqrt()).abs() < 1e-9);

        assert!(detect(AnomalySensitivity::Medium).flagged.is_empty());
        assert!(detect(AnomalySensitivity::Low).flagged.is_empty());
    }

    #[test]
    fn test_constant_and_short_columns_skipped() {
        assert!(ZScoreDetector::default().detect(&dataset(&[5, 5, 5, 5])).flagged.is_empty());
        assert!(ZScoreDetector::default().detect(&dataset(&[1, 1000])).flagged.is_empty());
    }

    #[test]
    fn test_excluded_column_skipped() {
        let mut values = vec![10; 9];
        values.push(1000);
        let detection = ZScoreDetector::default()
            .with_excluded_columns(vec!["value".to_string()])
            .detect(&dataset(&values));
        assert!(detection.flagged.is_empty());
    }

    #[test]
    fn test_bounds_detector() {
        let rules = vec![BoundRule::Range {
            field: "value".to_string(),
            lo: 0.0,
            hi: 100.0,
            tolerance: 0.5,
        }];
        let detector = BoundsDetector::new(rules);
        let detection = detector.detect(&dataset(&[1, 200, 50, -3]));
        assert_eq!(detection.flagged.into_iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(detector.name(), "bounds");
    }

    #[test]
    fn test_detector_for_config() {
        let config = DetectionConfig::new().with_detector(DetectorKind::Bounds);
        assert_eq!(detector_for(&config, Vec::new()).name(), "bounds");
        assert_eq!(detector_for(&DetectionConfig::default(), Vec::new()).name(), "z_score");
    }
}
