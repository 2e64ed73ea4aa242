// tests/property_tests.rs
//! Property-based checks of the pipeline invariants

use emg_force::experiment::{make_splits, ExperimentRun, RunCombination};
use emg_force::processing::{window_features, ChannelRange, SignalTable, WindowConfig, WindowStatistic};
use emg_force::recording::RecordingIdentity;
use emg_force::stats::{KeyPattern, StatTable};
use ndarray::Array2;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn trial(minute: u32, second: u32) -> RecordingIdentity {
    RecordingIdentity::parse(format!(
        "emg_force-03-sequential-2018-05-11-11-{:02}-{:02}-000.json",
        minute, second
    ))
    .unwrap()
}

fn ramp_table(samples: usize) -> SignalTable {
    SignalTable::new(
        (0..samples).map(|i| i as f64).collect(),
        Array2::from_shape_fn((samples, 2), |(i, c)| ((i + c) as f64 * 0.3).sin()),
        Array2::from_shape_fn((samples, 1), |(i, _)| i as f64),
        (0..samples).map(|i| i as i64).collect(),
    )
    .unwrap()
}

fn run(split: usize, regressor: &str, offset: f64) -> ExperimentRun {
    let truth = Array2::from_shape_fn((3, 2), |(r, c)| (r * 2 + c) as f64);
    ExperimentRun {
        combination: RunCombination {
            split_index: split,
            regressor: regressor.to_string(),
            feature_set: "RMS".to_string(),
            trajectory: "Index".to_string(),
        },
        predicted: &truth + offset,
        ground_truth: truth,
        fit_ms: 1.0,
        predict_ms: 1.0,
    }
}

proptest! {
    #[test]
    fn prop_identity_survives_suffixes(
        subject in "[0-9]{2}",
        protocol in "(sequential|repeated_random)",
        hour in 0u32..24,
        millis in 0u32..1000,
    ) {
        let stem = format!("emg_force-{}-{}-2018-05-11-{:02}-15-30-{:03}", subject, protocol, hour, millis);
        let plain = RecordingIdentity::parse(format!("{}.json", stem)).unwrap();
        let suffixed = RecordingIdentity::parse(format!("{}_filtered_features.json", stem)).unwrap();

        prop_assert_eq!(plain.subject_id(), subject.as_str());
        prop_assert_eq!(plain.to_file_stem(), stem.clone());
        prop_assert_eq!(suffixed.to_file_stem(), stem);
        prop_assert_eq!(plain.trial(), suffixed.trial());
    }

    #[test]
    fn prop_window_count_and_alignment(
        samples in 1usize..400,
        length in 1usize..64,
        stride in 1usize..32,
    ) {
        let config = WindowConfig::new(length, stride).unwrap();
        let windows = window_features(&ramp_table(samples), &config, &[WindowStatistic::Rms]).unwrap();

        let expected = if samples < length { 0 } else { (samples - length) / stride + 1 };
        prop_assert_eq!(windows.len(), expected);
        for window in &windows {
            prop_assert!(window.reference < window.start + length);
            prop_assert!(window.reference < samples);
            // force of the ramp equals its sample index
            prop_assert_eq!(window.force[0], window.reference as f64);
            prop_assert_eq!(window.label, window.reference as i64);
        }
    }

    #[test]
    fn prop_normalized_force_in_unit_range(
        min in -100.0f64..100.0,
        span in 0.0f64..50.0,
        a in -200.0f64..200.0,
        b in -200.0f64..200.0,
    ) {
        let range = ChannelRange { min, max: min + span };
        let (na, nb) = (range.normalize(a), range.normalize(b));
        prop_assert!((0.0..=1.0).contains(&na));
        prop_assert!((0.0..=1.0).contains(&nb));
        if a <= b {
            prop_assert!(na <= nb);
        }
    }

    #[test]
    fn prop_splits_partition_the_group(trials in 1usize..24, k in 1usize..8) {
        let group: Vec<_> = (0..trials as u32).map(|i| trial(i, i % 7)).collect();
        match make_splits(&group, k) {
            Ok(splits) => {
                prop_assert!(k <= trials);
                prop_assert_eq!(splits.len(), k);

                let mut held_out = BTreeSet::new();
                for split in &splits {
                    let test: BTreeSet<_> = split.test.iter().collect();
                    let train: BTreeSet<_> = split.train.iter().collect();
                    prop_assert!(!split.test.is_empty());
                    prop_assert!(test.is_disjoint(&train));
                    prop_assert_eq!(test.len() + train.len(), trials);
                    for record in &split.test {
                        prop_assert!(held_out.insert(record.clone()));
                    }
                }
                prop_assert_eq!(held_out.len(), trials);

                let sizes: Vec<_> = splits.iter().map(|s| s.test.len()).collect();
                prop_assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
            }
            Err(_) => prop_assert!(k > trials),
        }
    }

    #[test]
    fn prop_merge_of_halves_equals_full_ingest(
        offsets in prop::collection::vec((0usize..3, -2.0f64..2.0), 0..20),
        cut in 0usize..20,
    ) {
        let regressors = ["LR", "MLP", "SVR"];
        let runs: Vec<_> = offsets
            .iter()
            .enumerate()
            .map(|(i, (r, offset))| run(i, regressors[*r], *offset))
            .collect();
        let cut = cut.min(runs.len());

        let mut full = StatTable::new();
        for r in &runs {
            full.ingest(r).unwrap();
        }

        let mut left = StatTable::new();
        let mut right = StatTable::new();
        for r in &runs[..cut] {
            left.ingest(r).unwrap();
        }
        for r in &runs[cut..] {
            right.ingest(r).unwrap();
        }

        let mut forward = left.clone();
        forward.merge(right.clone());
        right.merge(left);

        prop_assert_eq!(&forward, &full);
        prop_assert_eq!(&right, &full);
    }

    #[test]
    fn prop_ingesting_runs_twice_keeps_both_copies(
        offsets in prop::collection::vec((0usize..3, -2.0f64..2.0), 1..12),
    ) {
        let regressors = ["LR", "MLP", "SVR"];
        let runs: Vec<_> = offsets
            .iter()
            .enumerate()
            .map(|(i, (r, offset))| run(i, regressors[*r], *offset))
            .collect();

        let mut once = StatTable::new();
        for r in &runs {
            once.ingest(r).unwrap();
        }
        let mut twice = StatTable::new();
        for r in runs.iter().chain(runs.iter()) {
            twice.ingest(r).unwrap();
        }

        let mut doubled = once.clone();
        doubled.merge(once.clone());
        prop_assert_eq!(&twice, &doubled);

        let all = twice.query(&KeyPattern::any());
        prop_assert_eq!(all.rmse.len(), 2 * runs.len());
        prop_assert_eq!(all.std.len(), 2 * runs.len());

        let single = once.summary(&KeyPattern::any());
        let repeated = twice.summary(&KeyPattern::any());
        prop_assert_eq!(single.len(), repeated.len());
        for (a, b) in single.iter().zip(&repeated) {
            prop_assert_eq!(&a.key, &b.key);
            prop_assert_eq!(b.count, 2 * a.count);
            prop_assert!((a.mean_rmse - b.mean_rmse).abs() < 1e-9);
            prop_assert!((a.mean_std - b.mean_std).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_suffixed_copies_never_straddle_a_split(
        trials in 2usize..16,
        k in 1usize..6,
        copies in prop::collection::vec(any::<bool>(), 16),
    ) {
        let mut group: Vec<_> = (0..trials as u32).map(|i| trial(i, 0)).collect();
        for (i, copy) in copies.iter().take(trials).enumerate() {
            if *copy {
                group.push(
                    RecordingIdentity::parse(format!(
                        "emg_force-03-sequential-2018-05-11-11-{:02}-00-000_filtered_features.json",
                        i
                    ))
                    .unwrap(),
                );
            }
        }

        match make_splits(&group, k) {
            Ok(splits) => {
                prop_assert!(k <= trials);
                for split in &splits {
                    let test: BTreeSet<_> = split.test.iter().map(|r| r.trial()).collect();
                    let train: BTreeSet<_> = split.train.iter().map(|r| r.trial()).collect();
                    prop_assert!(test.is_disjoint(&train));
                    prop_assert_eq!(split.test.len() + split.train.len(), trials);
                }
            }
            Err(_) => prop_assert!(k > trials),
        }
    }
}
