// src/stats/mod.rs
//! Prediction error statistics and their aggregation
//!
//! For one run, `error = ground_truth - predicted` with the prediction read
//! in row-major order into the ground-truth shape. RMSE is
//! `sqrt(mean(error²))` and STD is the population standard deviation of the
//! same error values.

pub mod table;

pub use table::{KeyPattern, QueryResult, StatKey, StatSummary, StatTable};

use crate::error::{ForceError, ForceResult};
use crate::experiment::ResultArtifact;
use crate::storage::list_files;
use crate::config::constants::paths;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::warn;

/// RMSE and STD of one run's prediction error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorStat {
    pub rmse: f64,
    pub std: f64,
}

impl ErrorStat {
    /// Total order used to keep aggregated values canonical
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.rmse
            .total_cmp(&other.rmse)
            .then(self.std.total_cmp(&other.std))
    }
}

/// Error statistics of a prediction against its ground truth
pub fn compute_error_stats(ground_truth: &Array2<f64>, predicted: &Array2<f64>) -> ForceResult<ErrorStat> {
    if ground_truth.len() != predicted.len() {
        return Err(ForceError::shape_mismatch(
            "prediction elements",
            format!("{} ({:?})", ground_truth.len(), ground_truth.dim()),
            format!("{} ({:?})", predicted.len(), predicted.dim()),
        ));
    }
    if ground_truth.is_empty() {
        return Err(ForceError::invalid_data("prediction", "no values to compare"));
    }

    let errors: Vec<f64> = ground_truth
        .iter()
        .zip(predicted.iter())
        .map(|(t, p)| t - p)
        .collect();
    let n = errors.len() as f64;
    let mean = errors.iter().sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
    let std = (errors.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n).sqrt();
    Ok(ErrorStat { rmse, std })
}

/// One run of a result artifact with its error statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStat {
    pub group: String,
    pub split_index: usize,
    pub key: StatKey,
    pub rmse: f64,
    pub std: f64,
}

/// Per-run statistics of every artifact in `dir` whose key matches `pattern`
pub fn inspect_runs(dir: &Path, pattern: &KeyPattern) -> ForceResult<Vec<RunStat>> {
    let mut listing = Vec::new();
    for file in list_files(dir, paths::TABLE_EXTENSION)? {
        let artifact = match ResultArtifact::load(&file) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("Skipping result file {}: {}", file.display(), e);
                continue;
            }
        };
        for run in &artifact.runs {
            let key = StatKey::of(run);
            if !pattern.matches(&key) {
                continue;
            }
            let stat = compute_error_stats(&run.ground_truth, &run.predicted)?;
            listing.push(RunStat {
                group: artifact.group.to_string(),
                split_index: run.combination.split_index,
                key,
                rmse: stat.rmse,
                std: stat.std,
            });
        }
    }
    Ok(listing)
}
