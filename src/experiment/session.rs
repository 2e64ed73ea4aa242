// src/experiment/session.rs
//! Per-subject experiment driver
//!
//! Subjects are processed one at a time. A [`SubjectSession`] owns every
//! feature table of its subject and releases them when it goes out of scope,
//! whether the subject's sweep finished or bailed out with an error.

use super::assembler::FeatureTables;
use super::evaluator::Evaluator;
use super::split::splits_for_records;
use crate::config::ExperimentConfig;
use crate::error::{ForceError, ForceResult};
use crate::recording::{parse_all, RecordingIdentity};
use crate::storage::{list_files, TableStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Feature tables of one subject
#[derive(Debug)]
pub struct SubjectSession {
    subject_id: String,
    tables: FeatureTables,
}

impl SubjectSession {
    /// Load the tables of `records`; unreadable recordings are skipped
    pub fn load(
        subject_id: &str,
        records: &[RecordingIdentity],
        store: &dyn TableStore,
    ) -> Self {
        let mut tables = FeatureTables::new();
        for record in records {
            match store.load_features(Path::new(record.raw_path())) {
                Ok(table) => {
                    debug!("Loaded {} ({} windows)", record, table.n_rows());
                    tables.insert(record.clone(), table);
                }
                Err(e) => warn!("Skipping recording {}: {}", record, e),
            }
        }
        Self::from_tables(subject_id, tables)
    }

    pub fn from_tables(subject_id: &str, tables: FeatureTables) -> Self {
        info!("Subject {}: {} feature tables in memory", subject_id, tables.len());
        Self {
            subject_id: subject_id.to_string(),
            tables,
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn tables(&self) -> &FeatureTables {
        &self.tables
    }

    pub fn records(&self) -> Vec<RecordingIdentity> {
        self.tables.keys().cloned().collect()
    }

    /// Sweep every (subject, day) group and write one artifact per group
    pub fn run(
        &self,
        evaluator: &Evaluator,
        result_dir: &Path,
        summary: &mut ExperimentSummary,
    ) -> ForceResult<()> {
        let groups = splits_for_records(&self.records(), evaluator.sweep().n_splits);
        summary.groups_skipped += groups.failures.len();

        for (group, splits) in &groups.splits {
            let artifact = evaluator.evaluate_group(group, &self.tables, splits)?;
            summary.runs += artifact.runs.len();
            summary.failed_runs += artifact.failures.len();
            let path = artifact.save(result_dir)?;
            info!("Wrote {}", path.display());
            summary.artifacts.push(path);
        }
        Ok(())
    }
}

impl Drop for SubjectSession {
    fn drop(&mut self) {
        debug!(
            "Releasing {} feature tables of subject {}",
            self.tables.len(),
            self.subject_id
        );
    }
}

/// Counters of a whole experiment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentSummary {
    pub subjects: usize,
    pub recordings: usize,
    pub groups_skipped: usize,
    pub runs: usize,
    pub failed_runs: usize,
    pub artifacts: Vec<PathBuf>,
}

/// RAW recordings of `feature_dir` that pass the configured filter
pub fn discover_records(
    config: &ExperimentConfig,
    feature_dir: &Path,
    store: &dyn TableStore,
) -> ForceResult<Vec<RecordingIdentity>> {
    let files = list_files(feature_dir, store.extension())?;
    let (raw, calibration): (Vec<_>, Vec<_>) =
        parse_all(files.as_slice()).into_iter().partition(|r| r.is_raw());
    if !calibration.is_empty() {
        debug!("Ignoring {} calibration recordings", calibration.len());
    }
    config.filter.apply(&raw)
}

/// Learn stage: sweep every subject found in `feature_dir`
pub fn run_experiment(
    config: &ExperimentConfig,
    feature_dir: &Path,
    result_dir: &Path,
    store: &dyn TableStore,
) -> ForceResult<ExperimentSummary> {
    config.validate()?;
    let evaluator = Evaluator::new(&config.sweep, &config.preprocessing.force_feature_name)?;
    if !result_dir.is_dir() {
        return Err(ForceError::Storage {
            path: result_dir.display().to_string(),
            reason: "result folder does not exist".to_string(),
        });
    }

    let records = discover_records(config, feature_dir, store)?;
    let mut by_subject: BTreeMap<String, Vec<RecordingIdentity>> = BTreeMap::new();
    for record in records {
        by_subject
            .entry(record.subject_id().to_string())
            .or_default()
            .push(record);
    }
    info!("{} subjects selected from {}", by_subject.len(), feature_dir.display());

    let mut summary = ExperimentSummary::default();
    for (subject_id, records) in &by_subject {
        let session = SubjectSession::load(subject_id, records, store);
        summary.subjects += 1;
        summary.recordings += session.tables().len();
        session.run(&evaluator, result_dir, &mut summary)?;
    }

    info!(
        "Experiment finished: {} runs, {} failed, {} groups skipped",
        summary.runs, summary.failed_runs, summary.groups_skipped
    );
    Ok(summary)
}
