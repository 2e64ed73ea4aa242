// src/experiment/evaluator.rs
//! Split × trajectory × feature set × regressor sweep
//!
//! Every combination is an independent unit of work producing either an
//! [`ExperimentRun`] or a [`RunFailure`]. Under [`FailurePolicy::Skip`] a
//! failure is logged and the sweep continues; under [`FailurePolicy::Abort`]
//! the first failure ends the sweep with its error.

use super::artifact::{ExperimentRun, ResultArtifact, RunCombination, RunFailure};
use super::assembler::{assemble, AssembledData, FeatureTables};
use super::pipeline::build_pipeline;
use super::regressors::PredictorConfig;
use super::split::{GroupKey, Split};
use crate::config::{FailurePolicy, FeatureSetConfig, SweepConfig, TrajectoryConfig};
use crate::error::{ForceError, ForceResult};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Regressor id with its resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRegressor {
    pub id: String,
    pub predictor: PredictorConfig,
}

/// Sweep driver for one subject's feature tables
#[derive(Debug, Clone)]
pub struct Evaluator {
    sweep: SweepConfig,
    regressors: Vec<ResolvedRegressor>,
    force_feature_name: String,
}

impl Evaluator {
    /// Resolve every regressor up front; a bad one is a configuration error
    pub fn new(sweep: &SweepConfig, force_feature_name: &str) -> ForceResult<Self> {
        let regressors = sweep
            .regressors
            .iter()
            .map(|r| {
                r.resolve().map(|predictor| ResolvedRegressor {
                    id: r.id.clone(),
                    predictor,
                })
            })
            .collect::<ForceResult<Vec<_>>>()
            .map_err(|e| match e {
                ForceError::UnknownPredictor(id) => {
                    ForceError::config("sweep.regressors", format!("unknown predictor '{}'", id))
                }
                other => other,
            })?;

        Ok(Self {
            sweep: sweep.clone(),
            regressors,
            force_feature_name: force_feature_name.to_string(),
        })
    }

    pub fn regressors(&self) -> &[ResolvedRegressor] {
        &self.regressors
    }

    pub fn sweep(&self) -> &SweepConfig {
        &self.sweep
    }

    /// Fit and predict one regressor on already assembled data
    pub fn run_regressor(
        &self,
        data: &AssembledData,
        regressor: &ResolvedRegressor,
        combination: RunCombination,
    ) -> ForceResult<ExperimentRun> {
        let fit_started = Instant::now();
        let pipeline = build_pipeline(
            data.train.input.view(),
            data.train.output.view(),
            &regressor.predictor,
            self.sweep.normalize_per_feature,
            self.sweep.fit_budget(),
        )?;
        let fit_ms = fit_started.elapsed().as_secs_f64() * 1e3;

        let predict_started = Instant::now();
        let predicted = pipeline.predict(data.test.input.view())?;
        let predict_ms = predict_started.elapsed().as_secs_f64() * 1e3;

        debug!(
            "{}: fit {:.1} ms, predict {:.1} ms on {} train / {} test rows",
            combination,
            fit_ms,
            predict_ms,
            data.train.n_rows(),
            data.test.n_rows()
        );

        Ok(ExperimentRun {
            combination,
            ground_truth: data.test.output.clone(),
            predicted,
            fit_ms,
            predict_ms,
        })
    }

    /// Every regressor of one (split, trajectory, feature set)
    fn run_cell(
        &self,
        tables: &FeatureTables,
        split: &Split,
        trajectory: &TrajectoryConfig,
        feature_set: &FeatureSetConfig,
    ) -> Vec<Result<ExperimentRun, (RunCombination, ForceError)>> {
        let combination = |regressor: &ResolvedRegressor| RunCombination {
            split_index: split.index,
            regressor: regressor.id.clone(),
            feature_set: feature_set.id.clone(),
            trajectory: trajectory.id.clone(),
        };

        let data = match assemble(
            tables,
            split,
            &feature_set.features,
            &self.force_feature_name,
            &trajectory.channels,
        ) {
            Ok(data) => data,
            Err(e) => {
                // one assembly failure is a gap for every regressor of the cell
                let message = e.to_string();
                let mut first = Some(e);
                return self
                    .regressors
                    .iter()
                    .map(|r| {
                        let error = first
                            .take()
                            .unwrap_or_else(|| ForceError::invalid_data("assembly", message.clone()));
                        Err((combination(r), error))
                    })
                    .collect();
            }
        };

        self.regressors
            .iter()
            .map(|regressor| {
                let key = combination(regressor);
                self.run_regressor(&data, regressor, key.clone())
                    .map_err(|e| (key, e))
            })
            .collect()
    }

    /// Full sweep over `splits` of one (subject, day) group
    pub fn evaluate_group(
        &self,
        group: &GroupKey,
        tables: &FeatureTables,
        splits: &[Split],
    ) -> ForceResult<ResultArtifact> {
        let mut artifact = ResultArtifact::new(group.clone(), &self.sweep);
        info!(
            "Evaluating {}: {} splits x {} trajectories x {} feature sets x {} regressors",
            group,
            splits.len(),
            self.sweep.trajectories.len(),
            self.sweep.feature_sets.len(),
            self.regressors.len()
        );

        for split in splits {
            for trajectory in &self.sweep.trajectories {
                for feature_set in &self.sweep.feature_sets {
                    for result in self.run_cell(tables, split, trajectory, feature_set) {
                        match result {
                            Ok(run) => artifact.runs.push(run),
                            Err((combination, e)) => {
                                warn!("{} {} failed: {}", group, combination, e);
                                if self.sweep.failure_policy == FailurePolicy::Abort {
                                    return Err(e);
                                }
                                artifact.failures.push(RunFailure {
                                    combination,
                                    error: e.to_string(),
                                });
                            }
                        }
                    }
                }
            }
        }

        info!(
            "{}: {} runs completed, {} failed",
            group,
            artifact.runs.len(),
            artifact.failures.len()
        );
        Ok(artifact)
    }
}
