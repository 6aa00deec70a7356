//! Verification and detection result models.
//!
//! These are the serializable results the post-processor renders as
//! Markdown or JSON.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A record that breaks a declared bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundViolation {
    /// Zero-based row index
    pub row: usize,
    /// Identifier of the row, if the dataset has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// The rule that was broken
    pub rule: String,
    /// What the record holds instead
    pub detail: String,
}

/// Comparison between bound violations and the ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub dataset: String,
    pub record_count: usize,
    /// Number of rows marked in the ground truth
    pub marked: usize,
    /// Number of rows breaking at least one bound
    pub violating: usize,
    /// Marked rows that satisfy every bound
    pub marked_without_violation: Vec<usize>,
    /// Rows breaking a bound that the ground truth does not mark
    pub unmarked_with_violation: Vec<usize>,
    /// Every violation found, ordered by row
    pub violations: Vec<BoundViolation>,
}

impl VerificationReport {
    /// Whether bounds and ground truth agree on every row.
    pub fn is_consistent(&self) -> bool {
        self.marked_without_violation.is_empty() && self.unmarked_with_violation.is_empty()
    }
}

/// Outlier statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAnomaly {
    pub column_name: String,
    pub outlier_count: usize,
    pub z_score_threshold: f64,
    pub mean: f64,
    pub std_dev: f64,
}

/// Rows a detector flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Name of the detector that produced the result
    pub detector: String,
    /// Flagged row indices
    pub flagged: BTreeSet<usize>,
    /// Per-column statistics, for detectors that work column by column
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnAnomaly>,
}

impl Detection {
    /// Creates an empty detection result.
    pub fn new(detector: impl Into<String>) -> Self {
        Self {
            detector: detector.into(),
            flagged: BTreeSet::new(),
            columns: Vec::new(),
        }
    }
}

/// Recall for one anomaly kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindRecall {
    pub kind: String,
    pub injected: usize,
    pub detected: usize,
    pub recall: f64,
}

/// Detector performance against the ground truth.
///
/// Ratios with a zero denominator are reported as 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionScore {
    pub detector: String,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub per_kind: Vec<KindRecall>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_report_consistency() {
        let mut report = VerificationReport {
            dataset: "listings".to_string(),
            record_count: 10,
            marked: 1,
            violating: 1,
            marked_without_violation: vec![],
            unmarked_with_violation: vec![],
            violations: vec![],
        };
        assert!(report.is_consistent());

        report.unmarked_with_violation.push(3);
        assert!(!report.is_consistent());
    }

    #[test]
    fn test_detection_serializes_without_empty_columns() {
        let detection = Detection::new("bounds");
        let json = serde_json::to_value(&detection).unwrap();
        assert!(json.get("columns").is_none());
        assert_eq!(json["detector"], "bounds");
    }
}
