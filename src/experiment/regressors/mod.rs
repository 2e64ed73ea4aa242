// src/experiment/regressors/mod.rs
//! Regressor estimators behind a common fit/predict trait
//!
//! The pipeline only knows [`Regressor`]. Concrete estimators are selected
//! through [`PredictorConfig`], a typed configuration built from a predictor
//! id and a TOML argument table. Unknown ids and unknown argument keys are
//! rejected when the configuration is built, never at fit time.

pub mod linear;
pub mod mlp;
pub mod svr;

pub use linear::{LinearParams, LinearRegression};
pub use mlp::{Activation, MlpParams, MlpRegressor};
pub use svr::{LinearSvr, SvrParams};

use crate::error::{ForceError, ForceResult};
use ndarray::{Array2, ArrayView2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Fit/predict estimator over dense matrices
pub trait Regressor: fmt::Debug {
    /// Fit on `x` (samples × features) and `y` (samples × outputs)
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>, ctx: &FitContext) -> ForceResult<()>;

    /// Predict outputs for `x`; the regressor must be fitted
    fn predict(&self, x: ArrayView2<f64>) -> ForceResult<Array2<f64>>;

    fn name(&self) -> &str;
}

/// Wall-clock bookkeeping for a single fit
#[derive(Debug, Clone, Copy)]
pub struct FitContext {
    started: Instant,
    budget: Option<Duration>,
}

impl FitContext {
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fail with [`ForceError::FitBudgetExceeded`] once the budget is spent
    pub fn check(&self, predictor: &str) -> ForceResult<()> {
        match self.budget {
            Some(budget) if self.started.elapsed() > budget => Err(ForceError::FitBudgetExceeded {
                predictor: predictor.to_string(),
                budget_ms: budget.as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}

/// Recognised predictor kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictorKind {
    Linear,
    Mlp,
    Svr,
}

impl PredictorKind {
    /// Resolve a predictor identifier
    pub fn from_id(id: &str) -> ForceResult<Self> {
        match id {
            "LR" | "linear" | "LinearRegression" => Ok(PredictorKind::Linear),
            "MLP" | "MLPRegressor" => Ok(PredictorKind::Mlp),
            "SVR" | "LinearSVR" => Ok(PredictorKind::Svr),
            other => Err(ForceError::UnknownPredictor(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictorKind::Linear => "LR",
            PredictorKind::Mlp => "MLP",
            PredictorKind::Svr => "SVR",
        }
    }
}

impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed predictor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum PredictorConfig {
    Linear(LinearParams),
    Mlp(MlpParams),
    Svr(SvrParams),
}

impl PredictorConfig {
    /// Build from a predictor id and its argument table
    pub fn from_args(predictor: &str, args: &toml::Table) -> ForceResult<Self> {
        match PredictorKind::from_id(predictor)? {
            PredictorKind::Linear => parse_params(predictor, args).map(PredictorConfig::Linear),
            PredictorKind::Mlp => parse_params(predictor, args).map(PredictorConfig::Mlp),
            PredictorKind::Svr => parse_params(predictor, args).map(PredictorConfig::Svr),
        }
    }

    pub fn kind(&self) -> PredictorKind {
        match self {
            PredictorConfig::Linear(_) => PredictorKind::Linear,
            PredictorConfig::Mlp(_) => PredictorKind::Mlp,
            PredictorConfig::Svr(_) => PredictorKind::Svr,
        }
    }

    /// Fresh, unfitted regressor
    pub fn build(&self) -> ForceResult<Box<dyn Regressor>> {
        Ok(match self {
            PredictorConfig::Linear(params) => Box::new(LinearRegression::new(params.clone())),
            PredictorConfig::Mlp(params) => Box::new(MlpRegressor::new(params.clone())?),
            PredictorConfig::Svr(params) => Box::new(LinearSvr::new(params.clone())?),
        })
    }
}

fn parse_params<T: DeserializeOwned>(predictor: &str, args: &toml::Table) -> ForceResult<T> {
    toml::Value::Table(args.clone())
        .try_into()
        .map_err(|e: toml::de::Error| ForceError::config(predictor, e.to_string()))
}

/// Shared input checks for `fit`
pub(crate) fn check_fit_input(
    predictor: &str,
    x: &ArrayView2<f64>,
    y: &ArrayView2<f64>,
) -> ForceResult<()> {
    if x.nrows() != y.nrows() {
        return Err(ForceError::shape_mismatch(
            &format!("{} training rows", predictor),
            x.nrows(),
            y.nrows(),
        ));
    }
    if x.nrows() == 0 || x.ncols() == 0 || y.ncols() == 0 {
        return Err(ForceError::Fit {
            predictor: predictor.to_string(),
            reason: format!("empty training data {:?} -> {:?}", x.dim(), y.dim()),
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(ForceError::Fit {
            predictor: predictor.to_string(),
            reason: "training data contains non-finite values".to_string(),
        });
    }
    Ok(())
}

/// Shared input checks for `predict`
pub(crate) fn check_predict_input(
    predictor: &str,
    x: &ArrayView2<f64>,
    fitted_features: Option<usize>,
) -> ForceResult<usize> {
    let features = fitted_features.ok_or_else(|| ForceError::Fit {
        predictor: predictor.to_string(),
        reason: "predict called before fit".to_string(),
    })?;
    if x.ncols() != features {
        return Err(ForceError::shape_mismatch(
            &format!("{} prediction input columns", predictor),
            features,
            x.ncols(),
        ));
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predictor_ids() {
        assert_eq!(PredictorKind::from_id("LR").unwrap(), PredictorKind::Linear);
        assert_eq!(PredictorKind::from_id("MLPRegressor").unwrap(), PredictorKind::Mlp);
        assert_eq!(PredictorKind::from_id("SVR").unwrap(), PredictorKind::Svr);
        assert!(matches!(
            PredictorKind::from_id("RandomForest"),
            Err(ForceError::UnknownPredictor(id)) if id == "RandomForest"
        ));
    }

    #[test]
    fn test_typed_arguments() {
        let args: toml::Table = toml::from_str("hidden_layer_sizes = [8, 4]\nactivation = \"tanh\"").unwrap();
        match PredictorConfig::from_args("MLP", &args).unwrap() {
            PredictorConfig::Mlp(params) => {
                assert_eq!(params.hidden_layer_sizes, vec![8, 4]);
                assert_eq!(params.activation, Activation::Tanh);
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let args: toml::Table = toml::from_str("kernel = \"rbf\"\nepsilon = 0.1").unwrap();
        assert!(matches!(
            PredictorConfig::from_args("LR", &args),
            Err(ForceError::Config { .. })
        ));
    }

    #[test]
    fn test_wrong_argument_type_rejected() {
        let args: toml::Table = toml::from_str("max_iter = \"many\"").unwrap();
        assert!(PredictorConfig::from_args("SVR", &args).is_err());
    }

    #[test]
    fn test_fit_budget_check() {
        let ctx = FitContext::new(Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(
            ctx.check("MLP"),
            Err(ForceError::FitBudgetExceeded { budget_ms: 0, .. })
        ));
        assert!(FitContext::unbounded().check("MLP").is_ok());
    }
}
