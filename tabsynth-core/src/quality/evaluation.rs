//! Scoring of a detector against the ground truth.

use std::collections::BTreeSet;

use super::models::{Detection, DetectionScore, KindRecall};
use crate::models::GroundTruth;

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Scores flagged rows against the marked rows of the ground truth.
///
/// Flagged and marked rows at or beyond `truth.record_count` are ignored.
pub fn evaluate(detection: &Detection, truth: &GroundTruth) -> DetectionScore {
    let in_range = |row: &usize| *row < truth.record_count;
    let flagged: BTreeSet<usize> = detection.flagged.iter().copied().filter(in_range).collect();
    let marked: BTreeSet<usize> = truth.rows().into_iter().filter(in_range).collect();

    let true_positives = flagged.intersection(&marked).count();
    let false_positives = flagged.len() - true_positives;
    let false_negatives = marked.len() - true_positives;
    let true_negatives = truth
        .record_count
        .saturating_sub(true_positives + false_positives + false_negatives);

    let precision = ratio(true_positives, true_positives + false_positives);
    let recall = ratio(true_positives, true_positives + false_negatives);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    let per_kind = truth
        .counts_by_kind()
        .into_keys()
        .map(|kind| {
            let rows: Vec<usize> = truth
                .anomalies
                .iter()
                .filter(|m| m.kind == kind && in_range(&m.row))
                .map(|m| m.row)
                .collect();
            let injected = rows.len();
            let detected = rows.iter().filter(|row| flagged.contains(*row)).count();
            KindRecall {
                recall: ratio(detected, injected),
                kind,
                injected,
                detected,
            }
        })
        .collect();

    DetectionScore {
        detector: detection.detector.clone(),
        true_positives,
        false_positives,
        false_negatives,
        true_negatives,
        precision,
        recall,
        f1,
        per_kind,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::AnomalyMark;

    fn truth(marks: &[(usize, &str)]) -> GroundTruth {
        let mut truth = GroundTruth::new("test", 10);
        for (row, kind) in marks {
            truth.anomalies.push(AnomalyMark {
                row: *row,
                record_id: None,
                kind: (*kind).to_string(),
                fields: vec![],
            });
        }
        truth
    }

    fn detection(rows: &[usize]) -> Detection {
        let mut detection = Detection::new("z_score");
        detection.flagged = rows.iter().copied().collect();
        detection
    }

    #[test]
    fn test_perfect_detection() {
        let truth = truth(&[(8, "price_flip"), (9, "rapid_sale")]);
        let score = evaluate(&detection(&[8, 9]), &truth);
        assert_eq!(score.true_positives, 2);
        assert_eq!(score.false_positives, 0);
        assert_eq!(score.true_negatives, 8);
        assert_eq!(score.precision, 1.0);
        assert_eq!(score.recall, 1.0);
        assert_eq!(score.f1, 1.0);
    }

    #[test]
    fn test_partial_detection() {
        let truth = truth(&[(7, "price_flip"), (8, "price_flip"), (9, "rapid_sale")]);
        let score = evaluate(&detection(&[0, 7, 9]), &truth);
        assert_eq!(score.true_positives, 2);
        assert_eq!(score.false_positives, 1);
        assert_eq!(score.false_negatives, 1);
        assert_eq!(score.true_negatives, 6);
        assert!((score.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((score.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((score.f1 - 2.0 / 3.0).abs() < 1e-12);

        let flip = score.per_kind.iter().find(|k| k.kind == "price_flip").unwrap();
        assert_eq!(flip.injected, 2);
        assert_eq!(flip.detected, 1);
        assert_eq!(flip.recall, 0.5);
        let rapid = score.per_kind.iter().find(|k| k.kind == "rapid_sale").unwrap();
        assert_eq!(rapid.recall, 1.0);
    }

    #[test]
    fn test_nothing_flagged() {
        let truth = truth(&[(9, "price_flip")]);
        let score = evaluate(&detection(&[]), &truth);
        assert_eq!(score.precision, 0.0);
        assert_eq!(score.recall, 0.0);
        assert_eq!(score.f1, 0.0);
        assert_eq!(score.false_negatives, 1);
    }

    #[test]
    fn test_out_of_range_rows_ignored() {
        let truth = truth(&[(9, "price_flip")]);
        let score = evaluate(&detection(&[9, 42]), &truth);
        assert_eq!(score.false_positives, 0);
        assert_eq!(score.true_positives, 1);
    }

    #[test]
    fn test_marks_beyond_record_count_ignored() {
        let mut truth = GroundTruth::new("t", 3);
        for row in [1, 5] {
            truth.anomalies.push(AnomalyMark {
                row,
                record_id: None,
                kind: "price_flip".to_string(),
                fields: vec![],
            });
        }
        let score = evaluate(&detection(&[0, 1, 2]), &truth);
        assert_eq!(score.true_positives, 1);
        assert_eq!(score.false_positives, 2);
        assert_eq!(score.false_negatives, 0);
        assert_eq!(score.true_negatives, 0);
        assert_eq!(score.per_kind[0].injected, 1);
        assert_eq!(score.per_kind[0].recall, 1.0);
    }
}
