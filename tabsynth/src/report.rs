//! Markdown rendering of verification, scoring and description results.

use std::fmt::Write;

use serde::Serialize;
use tabsynth_core::quality::{BoundRule, Detection, DetectionScore, VerificationReport};
use tabsynth_core::{Column, DatasetConfig};

/// Rows listed before a table is cut short.
const MAX_LISTED_ROWS: usize = 50;

/// Everything `describe` reports about a configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Description {
    pub dataset: String,
    pub records: usize,
    pub seed: u64,
    pub columns: Vec<Column>,
    pub bounds: Vec<String>,
    pub anomaly_target: usize,
    pub anomaly_kinds: Vec<KindSummary>,
}

/// One catalog entry in a [`Description`].
#[derive(Debug, Clone, Serialize)]
pub struct KindSummary {
    pub name: String,
    pub weight: f64,
    pub description: Option<String>,
    pub fields: Vec<String>,
}

impl Description {
    pub fn new(config: &DatasetConfig, bounds: &[BoundRule]) -> Self {
        let (anomaly_target, anomaly_kinds) = match &config.anomalies {
            Some(anomalies) => (
                anomalies.marked_count(),
                anomalies
                    .kinds
                    .iter()
                    .map(|(name, kind)| KindSummary {
                        name: name.to_string(),
                        weight: kind.weight,
                        description: kind.description.clone(),
                        fields: kind.touched_fields(),
                    })
                    .collect(),
            ),
            None => (0, Vec::new()),
        };
        Self {
            dataset: config.name.clone(),
            records: config.records,
            seed: config.seed,
            columns: config.columns(),
            bounds: bounds.iter().map(ToString::to_string).collect(),
            anomaly_target,
            anomaly_kinds,
        }
    }
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Renders a ground-truth verification as Markdown.
pub fn verification_markdown(report: &VerificationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Ground truth verification: {}", report.dataset);
    let _ = writeln!(out);
    let status = if report.is_consistent() {
        "consistent"
    } else {
        "inconsistent"
    };
    let _ = writeln!(out, "- Status: **{}**", status);
    let _ = writeln!(out, "- Records: {}", report.record_count);
    let _ = writeln!(out, "- Marked rows: {}", report.marked);
    let _ = writeln!(out, "- Rows breaking a bound: {}", report.violating);
    let _ = writeln!(
        out,
        "- Marked rows within bounds: {}",
        report.marked_without_violation.len()
    );
    let _ = writeln!(
        out,
        "- Unmarked rows breaking a bound: {}",
        report.unmarked_with_violation.len()
    );

    if !report.marked_without_violation.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Marked rows within bounds");
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", row_list(&report.marked_without_violation));
    }

    if !report.violations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Violations");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Row | Record | Rule | Detail |");
        let _ = writeln!(out, "|----:|--------|------|--------|");
        for violation in report.violations.iter().take(MAX_LISTED_ROWS) {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                violation.row,
                escape(violation.record_id.as_deref().unwrap_or("-")),
                escape(&violation.rule),
                escape(&violation.detail)
            );
        }
        if report.violations.len() > MAX_LISTED_ROWS {
            let _ = writeln!(
                out,
                "\n_{} more violations omitted._",
                report.violations.len() - MAX_LISTED_ROWS
            );
        }
    }
    out
}

fn row_list(rows: &[usize]) -> String {
    rows.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a detector score as Markdown.
pub fn score_markdown(score: &DetectionScore, detection: &Detection) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Detector evaluation: {}", score.detector);
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|------:|");
    let _ = writeln!(out, "| Flagged rows | {} |", detection.flagged.len());
    let _ = writeln!(out, "| True positives | {} |", score.true_positives);
    let _ = writeln!(out, "| False positives | {} |", score.false_positives);
    let _ = writeln!(out, "| False negatives | {} |", score.false_negatives);
    let _ = writeln!(out, "| True negatives | {} |", score.true_negatives);
    let _ = writeln!(out, "| Precision | {} |", percent(score.precision));
    let _ = writeln!(out, "| Recall | {} |", percent(score.recall));
    let _ = writeln!(out, "| F1 | {:.3} |", score.f1);

    if !score.per_kind.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Recall by anomaly kind");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Kind | Injected | Detected | Recall |");
        let _ = writeln!(out, "|------|---------:|---------:|-------:|");
        for kind in &score.per_kind {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                escape(&kind.kind),
                kind.injected,
                kind.detected,
                percent(kind.recall)
            );
        }
    }

    if !detection.columns.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Column statistics");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Column | Mean | Std dev | Threshold | Outliers |");
        let _ = writeln!(out, "|--------|-----:|--------:|----------:|---------:|");
        for column in &detection.columns {
            let _ = writeln!(
                out,
                "| {} | {:.2} | {:.2} | {:.1} | {} |",
                escape(&column.column_name),
                column.mean,
                column.std_dev,
                column.z_score_threshold,
                column.outlier_count
            );
        }
    }
    out
}

/// Renders a configuration description as Markdown.
pub fn description_markdown(description: &Description) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Dataset: {}", description.dataset);
    let _ = writeln!(out);
    let _ = writeln!(out, "- Records: {}", description.records);
    let _ = writeln!(out, "- Seed: {}", description.seed);
    let _ = writeln!(out, "- Anomalous rows: {}", description.anomaly_target);
    let _ = writeln!(out);
    let _ = writeln!(out, "## Columns");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Column | Kind |");
    let _ = writeln!(out, "|--------|------|");
    for column in &description.columns {
        let _ = writeln!(out, "| {} | {} |", escape(&column.name), column.kind);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Bounds");
    let _ = writeln!(out);
    for bound in &description.bounds {
        let _ = writeln!(out, "- `{}`", bound);
    }

    if !description.anomaly_kinds.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Anomaly kinds");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Kind | Weight | Fields | Description |");
        let _ = writeln!(out, "|------|-------:|--------|-------------|");
        for kind in &description.anomaly_kinds {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                escape(&kind.name),
                kind.weight,
                escape(&kind.fields.join(", ")),
                escape(kind.description.as_deref().unwrap_or("")),
            );
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tabsynth_core::quality::{BoundViolation, KindRecall, declared_bounds};
    use tabsynth_core::presets;

    fn report(violations: usize) -> VerificationReport {
        VerificationReport {
            dataset: "school".to_string(),
            record_count: 200,
            marked: 20,
            violating: 20,
            marked_without_violation: vec![],
            unmarked_with_violation: vec![],
            violations: (0..violations)
                .map(|row| BoundViolation {
                    row,
                    record_id: Some(format!("STU-{:04}", row + 1)),
                    rule: "days_present in [150, 196]".to_string(),
                    detail: "value 200".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_verification_markdown() {
        let text = verification_markdown(&report(2));
        assert!(text.starts_with("# Ground truth verification: school"));
        assert!(text.contains("**consistent**"));
        assert!(text.contains("| 1 | STU-0002 | days_present in [150, 196] | value 200 |"));
    }

    #[test]
    fn test_verification_markdown_truncates() {
        let text = verification_markdown(&report(MAX_LISTED_ROWS + 5));
        assert!(text.contains("_5 more violations omitted._"));
    }

    #[test]
    fn test_score_markdown() {
        let mut detection = Detection::new("z_score");
        detection.flagged.insert(3);
        let score = DetectionScore {
            detector: "z_score".to_string(),
            true_positives: 1,
            false_positives: 0,
            false_negatives: 1,
            true_negatives: 8,
            precision: 1.0,
            recall: 0.5,
            f1: 2.0 / 3.0,
            per_kind: vec![KindRecall {
                kind: "price_flip".to_string(),
                injected: 2,
                detected: 1,
                recall: 0.5,
            }],
        };
        let text = score_markdown(&score, &detection);
        assert!(text.contains("| Precision | 100.0% |"));
        assert!(text.contains("| Recall | 50.0% |"));
        assert!(text.contains("| F1 | 0.667 |"));
        assert!(text.contains("| price_flip | 2 | 1 | 50.0% |"));
    }

    #[test]
    fn test_description_markdown() {
        let config = presets::ecommerce().unwrap();
        let description = Description::new(&config, &declared_bounds(&config));
        assert_eq!(description.anomaly_target, 42);
        assert_eq!(description.anomaly_kinds.len(), 5);

        let text = description_markdown(&description);
        assert!(text.contains("# Dataset: ecommerce"));
        assert!(text.contains("| order_id |"));
        assert!(text.contains("| refund_spike |"));
    }

    #[test]
    fn test_escape_pipes() {
        assert_eq!(escape("a|b"), "a\\|b");
    }
}
