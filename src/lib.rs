//! EMG-Force: EMG-to-finger-force regression experiment pipeline
//!
//! Turns time-aligned EMG/force recordings into windowed feature tables,
//! partitions them into reproducible train/test splits per subject and day,
//! fits a family of regressors for every split/feature-set/trajectory
//! combination and aggregates the prediction errors into RMSE/STD statistics.
//!
//! - [`recording`]: filename identities and whitelist/blacklist selection
//! - [`processing`]: denoising, MVC normalisation and windowing
//! - [`experiment`]: splits, matrix assembly, pipelines and the sweep
//! - [`stats`]: error statistics and their aggregation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use emg_force::config::ConfigLoader;
//! use emg_force::experiment::run_experiment;
//! use emg_force::stats::{KeyPattern, StatTable};
//! use emg_force::storage::JsonTableStore;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load()?;
//!     let store = JsonTableStore::new();
//!
//!     run_experiment(&config, Path::new("features"), Path::new("results"), &store)?;
//!
//!     let stats = StatTable::from_result_dir(Path::new("results"))?;
//!     for row in stats.summary(&KeyPattern::new(Some("LR"), None, None)) {
//!         println!("{}: {:.4}", row.key, row.mean_rmse);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod experiment;
pub mod processing;
pub mod recording;
pub mod stats;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, ExperimentConfig, FailurePolicy};
pub use error::{ErrorScope, ForceError, ForceResult};
pub use experiment::{
    assemble, build_pipeline, make_splits, run_experiment, Evaluator, ExperimentRun, FittedPipeline,
    PredictorConfig, ResultArtifact, Split,
};
pub use processing::{prepare_recordings, FeatureTable, SignalTable, WindowStatistic};
pub use recording::{filter, RecordFilter, RecordingIdentity, RecordingKind};
pub use stats::{KeyPattern, StatKey, StatTable};
pub use storage::{JsonTableStore, TableStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "EMG-to-finger-force regression experiment pipeline".to_string(),
        regressors: vec!["LR".to_string(), "MLP".to_string(), "SVR".to_string()],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// Supported predictor ids
    pub regressors: Vec<String>,
}
