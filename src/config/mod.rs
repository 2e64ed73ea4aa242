// src/config/mod.rs
//! Experiment configuration
//!
//! One TOML document drives both preparation and the learning sweep:
//!
//! ```toml
//! [preprocessing]
//! window = { length = 256, stride = 32 }
//! statistics = ["RMS", "MAV", "WL", "ZC", "SSC"]
//!
//! [filter.whitelists]
//! subject = ["01", "02"]
//!
//! [sweep]
//! n_splits = 3
//! failure_policy = "skip"
//!
//! [[sweep.trajectories]]
//! id = "Index"
//! channels = [3, 4]
//!
//! [[sweep.feature_sets]]
//! id = "RMS"
//! features = ["RMS"]
//!
//! [[sweep.regressors]]
//! id = "MLP"
//! predictor = "MLP"
//! args = { hidden_layer_sizes = [100], max_iter = 200 }
//! ```

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::ConfigLoader;

use crate::error::{ForceError, ForceResult};
use crate::experiment::regressors::PredictorConfig;
use crate::processing::denoise::BiquadDenoiser;
use crate::processing::statistics::WindowStatistic;
use crate::processing::windowing::WindowConfig;
use crate::recording::RecordFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Complete experiment configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,

    #[serde(default)]
    pub filter: RecordFilter,

    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Denoise → normalise → window settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PreprocessingConfig {
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: f64,

    #[serde(default = "defaults::window")]
    pub window: WindowConfig,

    #[serde(default = "defaults::statistics")]
    pub statistics: Vec<WindowStatistic>,

    #[serde(default = "defaults::force_feature_name")]
    pub force_feature_name: String,

    #[serde(default = "defaults::min_mvc_samples")]
    pub min_mvc_samples: usize,

    /// Only normalise against an MVC recorded on the trial's own day;
    /// otherwise fall back to the subject's earliest MVC
    #[serde(default = "defaults::require_same_day_mvc")]
    pub require_same_day_mvc: bool,

    #[serde(default)]
    pub denoise: DenoiseConfig,
}

/// Biquad denoiser settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DenoiseConfig {
    /// High-pass cutoff; `0` disables the high-pass section
    #[serde(default = "defaults::highpass_cutoff_hz")]
    pub highpass_cutoff_hz: Option<f64>,

    #[serde(default = "defaults::notch_frequencies_hz")]
    pub notch_frequencies_hz: Vec<f64>,

    #[serde(default = "defaults::notch_q")]
    pub notch_q: f64,
}

/// What to do when one sweep combination fails
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log, record the failure, continue with the next combination
    #[default]
    Skip,
    /// Stop the sweep at the first failure
    Abort,
}

/// Split × trajectory × feature set × regressor sweep
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    #[serde(default = "defaults::n_splits")]
    pub n_splits: usize,

    #[serde(default = "defaults::normalize_per_feature")]
    pub normalize_per_feature: bool,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Wall-clock budget per fit, milliseconds
    #[serde(default)]
    pub fit_budget_ms: Option<u64>,

    #[serde(default = "defaults::trajectories")]
    pub trajectories: Vec<TrajectoryConfig>,

    #[serde(default = "defaults::feature_sets")]
    pub feature_sets: Vec<FeatureSetConfig>,

    #[serde(default = "defaults::regressors")]
    pub regressors: Vec<RegressorConfig>,
}

/// Named set of force channels to predict
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TrajectoryConfig {
    pub id: String,
    pub channels: Vec<usize>,
}

/// Named subset of feature base names used as inputs
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FeatureSetConfig {
    pub id: String,
    pub features: Vec<String>,
}

/// Named regressor with its predictor id and arguments
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegressorConfig {
    pub id: String,
    pub predictor: String,
    #[serde(default)]
    pub args: toml::Table,
}

impl RegressorConfig {
    /// Typed predictor configuration; unknown ids or arguments are rejected
    pub fn resolve(&self) -> ForceResult<PredictorConfig> {
        PredictorConfig::from_args(&self.predictor, &self.args)
    }
}

/// Default value providers using constants
mod defaults {
    use super::*;
    use crate::config::constants::*;

    pub fn sample_rate_hz() -> f64 { signal::DEFAULT_SAMPLING_RATE_HZ }
    pub fn window() -> WindowConfig {
        WindowConfig {
            length: windowing::DEFAULT_WINDOW_LENGTH,
            stride: windowing::DEFAULT_WINDOW_STRIDE,
        }
    }
    pub fn statistics() -> Vec<WindowStatistic> {
        vec![
            WindowStatistic::Rms,
            WindowStatistic::Mav,
            WindowStatistic::Wl,
            WindowStatistic::Zc,
            WindowStatistic::Ssc,
        ]
    }
    pub fn force_feature_name() -> String { signal::DEFAULT_FORCE_FEATURE_NAME.to_string() }
    pub fn min_mvc_samples() -> usize { signal::MIN_MVC_SAMPLES }
    pub fn require_same_day_mvc() -> bool { false }

    pub fn highpass_cutoff_hz() -> Option<f64> { Some(filters::DEFAULT_HIGHPASS_CUTOFF_HZ) }
    pub fn notch_frequencies_hz() -> Vec<f64> { filters::POWERLINE_FREQUENCIES_HZ.to_vec() }
    pub fn notch_q() -> f64 { filters::DEFAULT_NOTCH_Q }

    pub fn n_splits() -> usize { sweep::DEFAULT_SPLIT_COUNT }
    pub fn normalize_per_feature() -> bool { true }

    pub fn trajectories() -> Vec<TrajectoryConfig> {
        let fingers = ["Thumb", "Index", "Middle", "Ring", "Small"];
        let mut trajectories: Vec<TrajectoryConfig> = fingers
            .iter()
            .enumerate()
            .map(|(i, finger)| TrajectoryConfig {
                id: finger.to_string(),
                channels: vec![2 * i + 1, 2 * i + 2],
            })
            .collect();
        trajectories.push(TrajectoryConfig {
            id: "All".to_string(),
            channels: (1..=signal::DEFAULT_FORCE_CHANNEL_COUNT).collect(),
        });
        trajectories
    }

    pub fn feature_sets() -> Vec<FeatureSetConfig> {
        vec![
            FeatureSetConfig {
                id: "RMS".to_string(),
                features: vec!["RMS".to_string()],
            },
            FeatureSetConfig {
                id: "Hudgins".to_string(),
                features: ["MAV", "WL", "ZC", "SSC"].iter().map(|s| s.to_string()).collect(),
            },
        ]
    }

    pub fn regressors() -> Vec<RegressorConfig> {
        let mut mlp_args = toml::Table::new();
        mlp_args.insert(
            "hidden_layer_sizes".to_string(),
            toml::Value::Array(vec![toml::Value::Integer(sweep::MLP_DEFAULT_HIDDEN_UNITS)]),
        );
        vec![
            RegressorConfig {
                id: "LR".to_string(),
                predictor: "LR".to_string(),
                args: toml::Table::new(),
            },
            RegressorConfig {
                id: "MLP".to_string(),
                predictor: "MLP".to_string(),
                args: mlp_args,
            },
        ]
    }
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
            window: defaults::window(),
            statistics: defaults::statistics(),
            force_feature_name: defaults::force_feature_name(),
            min_mvc_samples: defaults::min_mvc_samples(),
            require_same_day_mvc: defaults::require_same_day_mvc(),
            denoise: DenoiseConfig::default(),
        }
    }
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            highpass_cutoff_hz: defaults::highpass_cutoff_hz(),
            notch_frequencies_hz: defaults::notch_frequencies_hz(),
            notch_q: defaults::notch_q(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            n_splits: defaults::n_splits(),
            normalize_per_feature: defaults::normalize_per_feature(),
            failure_policy: FailurePolicy::default(),
            fit_budget_ms: None,
            trajectories: defaults::trajectories(),
            feature_sets: defaults::feature_sets(),
            regressors: defaults::regressors(),
        }
    }
}

impl SweepConfig {
    pub fn fit_budget(&self) -> Option<Duration> {
        self.fit_budget_ms.map(Duration::from_millis)
    }

    /// Validate the sweep section, collecting every problem found
    pub fn validate_into(&self, errors: &mut Vec<String>) {
        if self.n_splits == 0 {
            errors.push("sweep.n_splits must be at least 1".to_string());
        }

        check_ids("sweep.trajectories", self.trajectories.iter().map(|t| t.id.as_str()), errors);
        for trajectory in &self.trajectories {
            if trajectory.channels.is_empty() {
                errors.push(format!("trajectory '{}' has no channels", trajectory.id));
            }
            if trajectory.channels.contains(&0) {
                errors.push(format!("trajectory '{}': channels are 1-based", trajectory.id));
            }
        }

        check_ids("sweep.feature_sets", self.feature_sets.iter().map(|f| f.id.as_str()), errors);
        for set in &self.feature_sets {
            if set.features.is_empty() {
                errors.push(format!("feature set '{}' is empty", set.id));
            }
        }

        check_ids("sweep.regressors", self.regressors.iter().map(|r| r.id.as_str()), errors);
        for regressor in &self.regressors {
            if let Err(e) = regressor.resolve() {
                errors.push(format!("regressor '{}': {}", regressor.id, e));
            }
        }
    }
}

fn check_ids<'a>(section: &str, ids: impl Iterator<Item = &'a str>, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    let mut count = 0;
    for id in ids {
        count += 1;
        if id.is_empty() {
            errors.push(format!("{}: empty id", section));
        } else if !seen.insert(id) {
            errors.push(format!("{}: duplicate id '{}'", section, id));
        }
    }
    if count == 0 {
        errors.push(format!("{}: at least one entry required", section));
    }
}

impl ExperimentConfig {
    /// Validate the whole configuration before any work starts
    pub fn validate(&self) -> ForceResult<()> {
        let mut errors = Vec::new();
        let pre = &self.preprocessing;

        if let Err(e) = pre.window.validate() {
            errors.push(e.to_string());
        }
        if !(pre.sample_rate_hz > 0.0) {
            errors.push(format!("sample rate must be positive, got {}", pre.sample_rate_hz));
        } else if let Err(e) = BiquadDenoiser::new(&pre.denoise, pre.sample_rate_hz) {
            errors.push(e.to_string());
        }
        if pre.statistics.is_empty() {
            errors.push("preprocessing.statistics must not be empty".to_string());
        }
        let unique: HashSet<_> = pre.statistics.iter().collect();
        if unique.len() != pre.statistics.len() {
            errors.push("preprocessing.statistics contains duplicates".to_string());
        }
        if pre.force_feature_name.is_empty() {
            errors.push("preprocessing.force_feature_name must not be empty".to_string());
        }
        if pre.statistics.iter().any(|s| s.name() == pre.force_feature_name) {
            errors.push(format!(
                "preprocessing.force_feature_name '{}' collides with a statistic name",
                pre.force_feature_name
            ));
        }

        if let Err(e) = self.filter.validate() {
            errors.push(e.to_string());
        }

        self.sweep.validate_into(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ForceError::config("experiment", errors.join("; ")))
        }
    }
}
