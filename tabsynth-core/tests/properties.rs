//! Property tests over seeds and record counts.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use tabsynth_core::config::TargetSelection;
use tabsynth_core::quality::{check_dataset, declared_bounds, verify_ground_truth};
use tabsynth_core::sink::{OutputFormat, SinkOptions, encode_dataset};
use tabsynth_core::{pipeline, presets};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn marked_count_equals_target(seed in any::<u64>(), records in 20usize..150, tail in 0usize..20) {
        let mut config = presets::real_estate().unwrap().with_seed(seed).with_records(records);
        if let Some(anomalies) = config.anomalies.as_mut() {
            anomalies.selection = TargetSelection::Tail { count: tail };
        }
        let output = pipeline::run(&config).unwrap();
        prop_assert_eq!(output.dataset.len(), records);
        prop_assert_eq!(output.ground_truth.len(), tail);
        prop_assert!(output.ground_truth.rows().iter().all(|row| *row >= records - tail));
    }

    #[test]
    fn clean_records_stay_within_bounds(seed in any::<u64>(), records in 20usize..150) {
        let config = presets::real_estate().unwrap().with_seed(seed).with_records(records);
        let output = pipeline::run(&config).unwrap();
        let rules = declared_bounds(&config);
        let report = verify_ground_truth(&output.dataset, &output.ground_truth, &rules).unwrap();
        prop_assert!(report.is_consistent(), "{:?}", report.violations);
    }

    #[test]
    fn random_selection_marks_distinct_rows(seed in any::<u64>()) {
        let config = presets::ecommerce().unwrap().with_seed(seed);
        let output = pipeline::run(&config).unwrap();
        let rows = output.ground_truth.rows();
        prop_assert_eq!(rows.len(), 42);
        prop_assert!(rows.iter().all(|row| *row < 500));
        let violating: std::collections::BTreeSet<usize> = check_dataset(&output.dataset, &declared_bounds(&config))
            .into_iter()
            .map(|v| v.row)
            .collect();
        prop_assert_eq!(violating, rows);
    }

    #[test]
    fn same_seed_same_bytes(seed in any::<u64>()) {
        let config = presets::ecommerce().unwrap().with_seed(seed).with_records(60);
        let options = SinkOptions::new(OutputFormat::Tsv).with_label_column(true);
        let first = pipeline::run(&config).unwrap();
        let second = pipeline::run(&config).unwrap();
        prop_assert_eq!(
            encode_dataset(&first.dataset, Some(&first.ground_truth), &options).unwrap(),
            encode_dataset(&second.dataset, Some(&second.ground_truth), &options).unwrap()
        );
    }
}
