// src/stats/table.rs
//! Typed aggregation table of per-run error statistics

use super::{compute_error_stats, ErrorStat};
use crate::error::{ForceError, ForceResult};
use crate::experiment::{ExperimentRun, ResultArtifact};
use crate::storage::{list_files, read_json, write_json};
use crate::config::constants::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Aggregation key: (regressor, feature set, trajectory)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatKey {
    pub regressor: String,
    pub feature_set: String,
    pub trajectory: String,
}

impl StatKey {
    pub fn new(regressor: &str, feature_set: &str, trajectory: &str) -> Self {
        Self {
            regressor: regressor.to_string(),
            feature_set: feature_set.to_string(),
            trajectory: trajectory.to_string(),
        }
    }

    pub fn of(run: &ExperimentRun) -> Self {
        Self::new(
            &run.combination.regressor,
            &run.combination.feature_set,
            &run.combination.trajectory,
        )
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.regressor, self.feature_set, self.trajectory)
    }
}

/// Partial key; `None` positions match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPattern {
    pub regressor: Option<String>,
    pub feature_set: Option<String>,
    pub trajectory: Option<String>,
}

impl KeyPattern {
    pub fn new(regressor: Option<&str>, feature_set: Option<&str>, trajectory: Option<&str>) -> Self {
        Self {
            regressor: regressor.map(str::to_string),
            feature_set: feature_set.map(str::to_string),
            trajectory: trajectory.map(str::to_string),
        }
    }

    /// Pattern matching every key
    pub fn any() -> Self {
        Self::default()
    }

    pub fn matches(&self, key: &StatKey) -> bool {
        fn position(pattern: &Option<String>, value: &str) -> bool {
            pattern.as_deref().map_or(true, |p| p == value)
        }
        position(&self.regressor, &key.regressor)
            && position(&self.feature_set, &key.feature_set)
            && position(&self.trajectory, &key.trajectory)
    }
}

/// Scalars collected by [`StatTable::query`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rmse: Vec<f64>,
    pub std: Vec<f64>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rmse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rmse.is_empty()
    }
}

/// Per-key mean of the collected scalars
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatSummary {
    pub key: StatKey,
    pub count: usize,
    pub mean_rmse: f64,
    pub mean_std: f64,
}

/// One entry of the persisted statistics artifact
#[derive(Debug, Serialize, Deserialize)]
struct StatEntry {
    #[serde(flatten)]
    key: StatKey,
    rmse: Vec<f64>,
    std: Vec<f64>,
}

/// Append-only aggregation of error statistics
///
/// Scalars under a key are kept as (rmse, std) pairs in a canonical order, so
/// the table depends only on the multiset of ingested runs: merging is
/// commutative and associative, and ingesting halves then merging equals
/// ingesting everything at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatTable {
    records: BTreeMap<StatKey, Vec<ErrorStat>>,
}

impl StatTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StatKey> {
        self.records.keys()
    }

    pub fn get(&self, key: &StatKey) -> Option<&[ErrorStat]> {
        self.records.get(key).map(Vec::as_slice)
    }

    fn insert(&mut self, key: StatKey, stat: ErrorStat) {
        let values = self.records.entry(key).or_default();
        let at = values.partition_point(|v| v.canonical_cmp(&stat).is_lt());
        values.insert(at, stat);
    }

    /// Add the error statistics of one run
    pub fn ingest(&mut self, run: &ExperimentRun) -> ForceResult<()> {
        let stat = compute_error_stats(&run.ground_truth, &run.predicted)?;
        self.insert(StatKey::of(run), stat);
        Ok(())
    }

    /// Ingest every run of an artifact; returns the number of runs
    pub fn ingest_artifact(&mut self, artifact: &ResultArtifact) -> ForceResult<usize> {
        for run in &artifact.runs {
            self.ingest(run).map_err(|e| match e {
                ForceError::ShapeMismatch { context, expected, actual } => ForceError::ShapeMismatch {
                    context: format!("{} {}: {}", artifact.group, run.combination, context),
                    expected,
                    actual,
                },
                other => other,
            })?;
        }
        Ok(artifact.runs.len())
    }

    /// Union with `other`, keeping every scalar
    pub fn merge(&mut self, other: StatTable) {
        for (key, values) in other.records {
            let merged = self.records.entry(key).or_default();
            merged.extend(values);
            merged.sort_by(ErrorStat::canonical_cmp);
        }
    }

    /// All scalars under keys matching `pattern`, in key order
    pub fn query(&self, pattern: &KeyPattern) -> QueryResult {
        let mut result = QueryResult::default();
        for (_, values) in self.records.iter().filter(|(key, _)| pattern.matches(key)) {
            result.rmse.extend(values.iter().map(|v| v.rmse));
            result.std.extend(values.iter().map(|v| v.std));
        }
        result
    }

    /// Per-key count and means for keys matching `pattern`
    pub fn summary(&self, pattern: &KeyPattern) -> Vec<StatSummary> {
        self.records
            .iter()
            .filter(|(key, values)| pattern.matches(key) && !values.is_empty())
            .map(|(key, values)| {
                let count = values.len();
                StatSummary {
                    key: key.clone(),
                    count,
                    mean_rmse: values.iter().map(|v| v.rmse).sum::<f64>() / count as f64,
                    mean_std: values.iter().map(|v| v.std).sum::<f64>() / count as f64,
                }
            })
            .collect()
    }

    /// Aggregate every result artifact in `dir`
    ///
    /// Unreadable artifacts are logged and skipped; a run whose matrices
    /// disagree in size aborts the aggregation.
    pub fn from_result_dir(dir: &Path) -> ForceResult<Self> {
        let mut table = Self::new();
        let files = list_files(dir, paths::TABLE_EXTENSION)?;
        let mut runs = 0;
        for file in &files {
            match ResultArtifact::load(file) {
                Ok(artifact) => runs += table.ingest_artifact(&artifact)?,
                Err(e) => warn!("Skipping result file {}: {}", file.display(), e),
            }
        }
        info!(
            "Aggregated {} runs from {} files into {} keys",
            runs,
            files.len(),
            table.len()
        );
        Ok(table)
    }

    /// Write the statistics artifact
    pub fn save(&self, path: &Path) -> ForceResult<()> {
        let entries: Vec<StatEntry> = self
            .records
            .iter()
            .map(|(key, values)| StatEntry {
                key: key.clone(),
                rmse: values.iter().map(|v| v.rmse).collect(),
                std: values.iter().map(|v| v.std).collect(),
            })
            .collect();
        write_json(&entries, path, true)
    }

    pub fn load(path: &Path) -> ForceResult<Self> {
        let entries: Vec<StatEntry> = read_json(path)?;
        let mut table = Self::new();
        for entry in entries {
            if entry.rmse.len() != entry.std.len() {
                return Err(ForceError::shape_mismatch(
                    &format!("statistics for {}", entry.key),
                    entry.rmse.len(),
                    entry.std.len(),
                ));
            }
            let mut values: Vec<ErrorStat> = entry
                .rmse
                .into_iter()
                .zip(entry.std)
                .map(|(rmse, std)| ErrorStat { rmse, std })
                .collect();
            values.sort_by(ErrorStat::canonical_cmp);
            table.records.entry(entry.key).or_default().extend(values);
        }
        for values in table.records.values_mut() {
            values.sort_by(ErrorStat::canonical_cmp);
        }
        Ok(table)
    }
}
