// src/experiment/artifact.rs
//! Per-run results and the per-(subject, day) result artifact

use super::split::GroupKey;
use crate::config::{constants::paths, FeatureSetConfig, RegressorConfig, SweepConfig, TrajectoryConfig};
use crate::error::ForceResult;
use crate::storage::{read_json, write_json};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One split × trajectory × feature set × regressor combination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunCombination {
    pub split_index: usize,
    pub regressor: String,
    pub feature_set: String,
    pub trajectory: String,
}

impl fmt::Display for RunCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "split {} / {} / {} / {}",
            self.split_index, self.regressor, self.feature_set, self.trajectory
        )
    }
}

/// Successful combination: ground truth, prediction and timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRun {
    #[serde(flatten)]
    pub combination: RunCombination,
    pub ground_truth: Array2<f64>,
    pub predicted: Array2<f64>,
    pub fit_ms: f64,
    pub predict_ms: f64,
}

/// Failed combination; leaves a gap in the run list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    #[serde(flatten)]
    pub combination: RunCombination,
    pub error: String,
}

/// Durable result of one (subject, day) sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub group: GroupKey,
    pub trajectories: Vec<TrajectoryConfig>,
    pub feature_sets: Vec<FeatureSetConfig>,
    pub regressors: Vec<RegressorConfig>,
    pub runs: Vec<ExperimentRun>,
    pub failures: Vec<RunFailure>,
}

impl ResultArtifact {
    pub fn new(group: GroupKey, sweep: &SweepConfig) -> Self {
        Self {
            group,
            trajectories: sweep.trajectories.clone(),
            feature_sets: sweep.feature_sets.clone(),
            regressors: sweep.regressors.clone(),
            runs: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// `force_learn-<subject>-<YYYY-MM-DD>.json`
    pub fn file_name(group: &GroupKey) -> String {
        format!(
            "{}-{}.{}",
            paths::RESULT_FILE_PREFIX,
            group,
            paths::TABLE_EXTENSION
        )
    }

    /// Write into `dir`, returning the artifact path
    pub fn save(&self, dir: &Path) -> ForceResult<PathBuf> {
        let path = dir.join(Self::file_name(&self.group));
        write_json(self, &path, false)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> ForceResult<Self> {
        read_json(path)
    }
}
