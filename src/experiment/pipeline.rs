// src/experiment/pipeline.rs
//! Scaling + regressor pipeline

use super::regressors::{FitContext, PredictorConfig, Regressor};
use crate::error::{ForceError, ForceResult};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::time::Duration;

/// Per-feature standardisation fitted on training data
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Population mean/std per column; constant columns keep scale 1
    pub fn fit(x: ArrayView2<f64>) -> ForceResult<Self> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ForceError::invalid_data("scaler input", "no rows to fit on"))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> ForceResult<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            return Err(ForceError::shape_mismatch(
                "scaler input columns",
                self.mean.len(),
                x.ncols(),
            ));
        }
        Ok((&x - &self.mean) / &self.scale)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }
}

/// Fitted scaler (optional) and regressor
#[derive(Debug)]
pub struct FittedPipeline {
    scaler: Option<StandardScaler>,
    regressor: Box<dyn Regressor>,
    n_features: usize,
    n_outputs: usize,
}

impl FittedPipeline {
    /// Predict with the train-derived transform; column count must match training
    pub fn predict(&self, x: ArrayView2<f64>) -> ForceResult<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(ForceError::shape_mismatch(
                "pipeline input columns",
                self.n_features,
                x.ncols(),
            ));
        }
        let predicted = match &self.scaler {
            Some(scaler) => self.regressor.predict(scaler.transform(x)?.view())?,
            None => self.regressor.predict(x)?,
        };
        if predicted.dim() != (x.nrows(), self.n_outputs) {
            return Err(ForceError::shape_mismatch(
                &format!("{} prediction", self.regressor.name()),
                format!("{:?}", (x.nrows(), self.n_outputs)),
                format!("{:?}", predicted.dim()),
            ));
        }
        Ok(predicted)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn is_scaled(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn regressor_name(&self) -> &str {
        self.regressor.name()
    }
}

/// Fit a pipeline on training data
///
/// With `normalize_per_feature` the scaler is fitted on `train_input` only
/// and the same transform is reused by [`FittedPipeline::predict`].
pub fn build_pipeline(
    train_input: ArrayView2<f64>,
    train_output: ArrayView2<f64>,
    predictor: &PredictorConfig,
    normalize_per_feature: bool,
    fit_budget: Option<Duration>,
) -> ForceResult<FittedPipeline> {
    if train_input.nrows() != train_output.nrows() {
        return Err(ForceError::shape_mismatch(
            "training rows",
            train_input.nrows(),
            train_output.nrows(),
        ));
    }

    let ctx = FitContext::new(fit_budget);
    let mut regressor = predictor.build()?;
    let scaler = if normalize_per_feature {
        let scaler = StandardScaler::fit(train_input)?;
        let scaled = scaler.transform(train_input)?;
        regressor.fit(scaled.view(), train_output, &ctx)?;
        Some(scaler)
    } else {
        regressor.fit(train_input, train_output, &ctx)?;
        None
    };

    Ok(FittedPipeline {
        scaler,
        regressor,
        n_features: train_input.ncols(),
        n_outputs: train_output.ncols(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::regressors::LinearParams;
    use ndarray::array;

    #[test]
    fn test_scaler_uses_population_std() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();

        assert_eq!(scaler.mean(), &array![2.0, 5.0]);
        assert_eq!(scaler.scale(), &array![1.0, 1.0]);
        assert_eq!(scaler.transform(x.view()).unwrap(), array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_scaler_applies_train_parameters() {
        let train = array![[0.0], [10.0]];
        let scaler = StandardScaler::fit(train.view()).unwrap();
        let test = scaler.transform(array![[20.0]].view()).unwrap();
        assert!((test[[0, 0]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_pipeline_fit_predict() {
        let x = array![[1.0, 100.0], [2.0, 300.0], [3.0, 200.0], [4.0, 500.0]];
        let y = x.map_axis(Axis(1), |r| 0.5 * r[0] + 0.01 * r[1]).insert_axis(Axis(1));
        let predictor = PredictorConfig::Linear(LinearParams::default());

        for scaled in [true, false] {
            let pipeline = build_pipeline(x.view(), y.view(), &predictor, scaled, None).unwrap();
            assert_eq!(pipeline.is_scaled(), scaled);
            let predicted = pipeline.predict(x.view()).unwrap();
            assert_eq!(predicted.dim(), (4, 1));
            for (p, t) in predicted.iter().zip(y.iter()) {
                assert!((p - t).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_predict_column_mismatch() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 3.0]];
        let y = array![[1.0], [2.0], [3.0]];
        let predictor = PredictorConfig::Linear(LinearParams::default());
        let pipeline = build_pipeline(x.view(), y.view(), &predictor, true, None).unwrap();

        assert!(matches!(
            pipeline.predict(array![[1.0, 2.0, 3.0]].view()),
            Err(ForceError::ShapeMismatch { .. })
        ));
    }
}
