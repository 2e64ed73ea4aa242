// src/experiment/regressors/linear.rs
//! Ordinary least-squares regression, one coefficient column per output

use super::{check_fit_input, check_predict_input, FitContext, Regressor};
use crate::error::{ForceError, ForceResult};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Relative diagonal loading keeping collinear feature sets solvable
const RIDGE_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearParams {
    #[serde(default = "default_fit_intercept")]
    pub fit_intercept: bool,
}

fn default_fit_intercept() -> bool {
    true
}

impl Default for LinearParams {
    fn default() -> Self {
        Self {
            fit_intercept: default_fit_intercept(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinearRegression {
    params: LinearParams,
    coefficients: Option<Array2<f64>>,
    intercept: Option<Array1<f64>>,
}

impl LinearRegression {
    pub fn new(params: LinearParams) -> Self {
        Self {
            params,
            coefficients: None,
            intercept: None,
        }
    }

    /// Features × outputs coefficient matrix, once fitted
    pub fn coefficients(&self) -> Option<&Array2<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> Option<&Array1<f64>> {
        self.intercept.as_ref()
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>, _ctx: &FitContext) -> ForceResult<()> {
        check_fit_input(self.name(), &x, &y)?;

        let (x_mean, y_mean) = if self.params.fit_intercept {
            (
                x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols())),
                y.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(y.ncols())),
            )
        } else {
            (Array1::zeros(x.ncols()), Array1::zeros(y.ncols()))
        };
        let xc = &x - &x_mean;
        let yc = &y - &y_mean;

        let mut gram = xc.t().dot(&xc);
        let scale = gram.diag().iter().copied().fold(0.0_f64, f64::max).max(1.0);
        for i in 0..gram.nrows() {
            gram[[i, i]] += RIDGE_FLOOR * scale;
        }
        let rhs = xc.t().dot(&yc);

        let coefficients = solve(gram, rhs).ok_or_else(|| ForceError::Fit {
            predictor: self.name().to_string(),
            reason: "normal equations are singular".to_string(),
        })?;

        self.intercept = Some(&y_mean - &x_mean.dot(&coefficients));
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> ForceResult<Array2<f64>> {
        check_predict_input(self.name(), &x, self.coefficients.as_ref().map(|c| c.nrows()))?;
        match (&self.coefficients, &self.intercept) {
            (Some(coefficients), Some(intercept)) => Ok(x.dot(coefficients) + intercept),
            _ => Err(ForceError::Fit {
                predictor: self.name().to_string(),
                reason: "predict called before fit".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "LR"
    }
}

/// Solve `a · x = b` by Gaussian elimination with partial pivoting
fn solve(mut a: Array2<f64>, mut b: Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < f64::EPSILON {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            for k in 0..b.ncols() {
                b.swap([col, k], [pivot, k]);
            }
        }

        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            for k in 0..b.ncols() {
                b[[row, k]] -= factor * b[[col, k]];
            }
        }
    }

    let mut x = Array2::zeros(b.raw_dim());
    for row in (0..n).rev() {
        for k in 0..b.ncols() {
            let tail: f64 = (row + 1..n).map(|j| a[[row, j]] * x[[j, k]]).sum();
            x[[row, k]] = (b[[row, k]] - tail) / a[[row, row]];
        }
    }
    x.iter().all(|v: &f64| v.is_finite()).then_some(x)
}
