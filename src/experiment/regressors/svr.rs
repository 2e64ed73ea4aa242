// src/experiment/regressors/svr.rs
//! Linear support-vector regression
//!
//! Minimises `0.5·|w|² + C·Σ max(0, |y - w·x - b| - ε)` by
//! stochastic subgradient descent with a decaying step, one independent
//! model per output column.

use super::{check_fit_input, check_predict_input, FitContext, Regressor};
use crate::error::{ForceError, ForceResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SvrParams {
    /// Width of the insensitive tube
    #[serde(default = "defaults::epsilon")]
    pub epsilon: f64,

    /// Inverse regularisation strength
    #[serde(rename = "C", alias = "c", default = "defaults::c")]
    pub c: f64,

    #[serde(default = "defaults::learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "defaults::max_iter")]
    pub max_iter: usize,

    #[serde(default = "defaults::tol")]
    pub tol: f64,

    #[serde(default)]
    pub random_state: u64,
}

mod defaults {
    pub fn epsilon() -> f64 { 0.1 }
    pub fn c() -> f64 { 1.0 }
    pub fn learning_rate() -> f64 { 0.01 }
    pub fn max_iter() -> usize { 1000 }
    pub fn tol() -> f64 { 1e-5 }
}

impl Default for SvrParams {
    fn default() -> Self {
        Self {
            epsilon: defaults::epsilon(),
            c: defaults::c(),
            learning_rate: defaults::learning_rate(),
            max_iter: defaults::max_iter(),
            tol: defaults::tol(),
            random_state: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinearSvr {
    params: SvrParams,
    /// Features × outputs
    weights: Option<Array2<f64>>,
    bias: Option<Array1<f64>>,
}

impl LinearSvr {
    pub fn new(params: SvrParams) -> ForceResult<Self> {
        if params.epsilon < 0.0 || !(params.c > 0.0) || !(params.learning_rate > 0.0) || params.max_iter == 0 {
            return Err(ForceError::config(
                "SVR",
                "epsilon must be non-negative; C, learning_rate and max_iter positive",
            ));
        }
        Ok(Self {
            params,
            weights: None,
            bias: None,
        })
    }

    fn objective(&self, x: &ArrayView2<f64>, y: &ArrayView1<f64>, w: &Array1<f64>, b: f64) -> f64 {
        let hinge: f64 = x
            .dot(w)
            .iter()
            .zip(y.iter())
            .map(|(p, t)| ((t - p - b).abs() - self.params.epsilon).max(0.0))
            .sum();
        0.5 * w.dot(w) + self.params.c * hinge
    }

    fn fit_column(
        &self,
        x: &ArrayView2<f64>,
        y: ArrayView1<f64>,
        ctx: &FitContext,
    ) -> ForceResult<(Array1<f64>, f64)> {
        let n = x.nrows();
        let lambda = 1.0 / (self.params.c * n as f64);
        let mut rng = StdRng::seed_from_u64(self.params.random_state);
        let mut order: Vec<usize> = (0..n).collect();

        let mut w = Array1::<f64>::zeros(x.ncols());
        let mut b = 0.0;
        let mut previous = self.objective(x, &y, &w, b);

        for epoch in 0..self.params.max_iter {
            ctx.check(self.name())?;
            order.shuffle(&mut rng);
            let eta = self.params.learning_rate / (1.0 + epoch as f64).sqrt();

            for &i in &order {
                let row = x.row(i);
                let residual = y[i] - row.dot(&w) - b;
                w *= 1.0 - eta * lambda;
                if residual.abs() > self.params.epsilon {
                    let sign = residual.signum();
                    w.scaled_add(eta * sign, &row);
                    b += eta * sign;
                }
            }

            let current = self.objective(x, &y, &w, b);
            if !current.is_finite() {
                return Err(ForceError::Fit {
                    predictor: self.name().to_string(),
                    reason: format!("objective diverged at epoch {}", epoch + 1),
                });
            }
            if (previous - current).abs() <= self.params.tol * previous.abs().max(1.0) {
                break;
            }
            previous = current;
        }
        Ok((w, b))
    }
}

impl Regressor for LinearSvr {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>, ctx: &FitContext) -> ForceResult<()> {
        check_fit_input(self.name(), &x, &y)?;

        let mut weights = Array2::zeros((x.ncols(), y.ncols()));
        let mut bias = Array1::zeros(y.ncols());
        for (output, column) in y.axis_iter(Axis(1)).enumerate() {
            let (w, b) = self.fit_column(&x, column, ctx)?;
            weights.column_mut(output).assign(&w);
            bias[output] = b;
        }

        self.weights = Some(weights);
        self.bias = Some(bias);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> ForceResult<Array2<f64>> {
        check_predict_input(self.name(), &x, self.weights.as_ref().map(|w| w.nrows()))?;
        match (&self.weights, &self.bias) {
            (Some(weights), Some(bias)) => Ok(x.dot(weights) + bias),
            _ => Err(ForceError::Fit {
                predictor: self.name().to_string(),
                reason: "predict called before fit".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "SVR"
    }
}
