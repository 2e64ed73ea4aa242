// tests/end_to_end_tests.rs
//! Prepare → learn → statistics over synthetic recordings

mod common;

use common::*;
use emg_force::experiment::{
    assemble, build_pipeline, make_splits, run_experiment, Evaluator, FeatureTables, GroupKey,
    ResultArtifact,
};
use emg_force::processing::prepare_recordings;
use emg_force::stats::{KeyPattern, StatKey, StatTable};
use emg_force::storage::{list_files, JsonTableStore, TableStore};
use std::path::Path;
use tempfile::tempdir;

fn load_tables(dir: &Path) -> FeatureTables {
    let store = JsonTableStore::new();
    list_files(dir, "json")
        .unwrap()
        .into_iter()
        .map(|path| {
            let record = emg_force::RecordingIdentity::parse(&path).unwrap();
            (record, store.load_features(&path).unwrap())
        })
        .collect()
}

#[test]
fn test_six_trials_three_splits() {
    let dir = tempdir().unwrap();
    write_feature_tables(dir.path(), "01", DAY, 6, 40);
    let tables = load_tables(dir.path());
    let records: Vec<_> = tables.keys().cloned().collect();

    let splits = make_splits(&records, 3).unwrap();
    assert_eq!(splits.len(), 3);
    for split in &splits {
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 4);
    }

    let data = assemble(&tables, &splits[0], &["RMS".to_string()], "FORCE", &[3, 4]).unwrap();
    assert_eq!(data.train.input_columns, vec!["RMS_1", "RMS_2", "RMS_3", "RMS_4"]);
    assert_eq!(data.train.output_columns, vec!["FORCE_3", "FORCE_4"]);
    assert_eq!(data.train.n_rows(), 4 * 40);
    assert_eq!(data.test.n_rows(), 2 * 40);

    let config = test_config();
    let predictor = config.sweep.regressors[0].resolve().unwrap();
    let pipeline = build_pipeline(
        data.train.input.view(),
        data.train.output.view(),
        &predictor,
        true,
        None,
    )
    .unwrap();
    let predicted = pipeline.predict(data.test.input.view()).unwrap();
    assert_eq!(predicted.dim(), data.test.output.dim());
}

#[test]
fn test_group_sweep_feeds_one_stat_key() {
    let dir = tempdir().unwrap();
    write_feature_tables(dir.path(), "01", DAY, 6, 40);
    let tables = load_tables(dir.path());
    let records: Vec<_> = tables.keys().cloned().collect();
    let splits = make_splits(&records, 3).unwrap();

    let config = test_config();
    let evaluator = Evaluator::new(&config.sweep, "FORCE").unwrap();
    let artifact = evaluator
        .evaluate_group(&GroupKey::of(&records[0]), &tables, &splits)
        .unwrap();
    assert_eq!(artifact.runs.len(), 3);
    assert!(artifact.failures.is_empty());

    let mut table = StatTable::new();
    assert_eq!(table.ingest_artifact(&artifact).unwrap(), 3);
    assert_eq!(
        table.keys().cloned().collect::<Vec<_>>(),
        vec![StatKey::new("LR", "RMS", "Index")]
    );

    let result = table.query(&KeyPattern::new(Some("LR"), Some("RMS"), Some("Index")));
    assert_eq!(result.len(), 3);
    // force is linear in RMS plus small noise
    assert!(result.rmse.iter().all(|&rmse| rmse < 0.1));
}

#[test]
fn test_learn_writes_one_artifact_per_group() {
    let features = tempdir().unwrap();
    let results = tempdir().unwrap();
    write_feature_tables(features.path(), "01", DAY, 6, 30);
    write_feature_tables(features.path(), "01", "2018-05-14", 4, 30);
    write_feature_tables(features.path(), "02", DAY, 3, 30);

    let config = test_config();
    let summary =
        run_experiment(&config, features.path(), results.path(), &JsonTableStore::new()).unwrap();

    assert_eq!(summary.subjects, 2);
    assert_eq!(summary.recordings, 13);
    assert_eq!(summary.artifacts.len(), 3);
    assert_eq!(summary.runs, 9);
    assert_eq!(summary.failed_runs, 0);

    let artifact = ResultArtifact::load(&results.path().join("force_learn-01-2018-05-14.json")).unwrap();
    assert_eq!(artifact.runs.len(), 3);
    assert_eq!(artifact.regressors.len(), 1);

    let stats = StatTable::from_result_dir(results.path()).unwrap();
    assert_eq!(stats.query(&KeyPattern::any()).len(), 9);
}

#[test]
fn test_full_pipeline_from_raw_recordings() {
    let raw = tempdir().unwrap();
    let features = tempdir().unwrap();
    let results = tempdir().unwrap();
    write_raw_recordings(raw.path(), "01", DAY, 4, 2000);

    let mut config = test_config();
    config.sweep.n_splits = 2;
    let store = JsonTableStore::new();

    let prepared = prepare_recordings(&config, raw.path(), features.path(), &store).unwrap();
    assert_eq!(prepared.prepared.len(), 4);
    assert!(prepared.skipped.is_empty());

    let table = store.load_features(&prepared.prepared[0]).unwrap();
    assert_eq!(table.n_rows(), config.preprocessing.window.window_count(2000));
    assert!(table.column_index("RMS_1").is_some());
    assert!(table.column_index("WL_4").is_some());
    assert!(table.column_index("FORCE_10").is_some());

    let summary = run_experiment(&config, features.path(), results.path(), &store).unwrap();
    assert_eq!(summary.artifacts.len(), 1);
    assert_eq!(summary.runs, 2);

    let stats = StatTable::from_result_dir(results.path()).unwrap();
    let stats_file = results.path().join("stats").join("force_stats.json");
    std::fs::create_dir_all(stats_file.parent().unwrap()).unwrap();
    stats.save(&stats_file).unwrap();
    assert_eq!(StatTable::load(&stats_file).unwrap(), stats);

    let summary = stats.summary(&KeyPattern::any());
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].count, 2);
    assert!(summary[0].mean_rmse.is_finite());
}
