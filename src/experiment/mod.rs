// src/experiment/mod.rs
//! Cross-validation experiment: splits, assembly, fitting and evaluation

pub mod artifact;
pub mod assembler;
pub mod evaluator;
pub mod pipeline;
pub mod regressors;
pub mod session;
pub mod split;

pub use artifact::{ExperimentRun, ResultArtifact, RunCombination, RunFailure};
pub use assembler::{assemble, AssembledData, DataSide, FeatureTables};
pub use evaluator::{Evaluator, ResolvedRegressor};
pub use pipeline::{build_pipeline, FittedPipeline, StandardScaler};
pub use regressors::{FitContext, PredictorConfig, PredictorKind, Regressor};
pub use session::{discover_records, run_experiment, ExperimentSummary, SubjectSession};
pub use split::{group_by_subject_and_day, make_splits, splits_for_records, unique_trials, GroupKey, GroupSplits, Split};
