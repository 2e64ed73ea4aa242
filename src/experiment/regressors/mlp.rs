// src/experiment/regressors/mlp.rs
//! Multilayer perceptron regressor trained with Adam on squared error
//!
//! Identity output layer, configurable hidden activation, L2 penalty and
//! minibatch training with a seeded generator so a given configuration and
//! data set always produce the same model.

use super::{check_fit_input, check_predict_input, FitContext, Regressor};
use crate::error::{ForceError, ForceResult};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

/// Hidden layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Tanh,
    Logistic,
    Identity,
}

impl Activation {
    fn apply(&self, z: &mut Array2<f64>) {
        match self {
            Activation::Relu => z.mapv_inplace(|v| v.max(0.0)),
            Activation::Tanh => z.mapv_inplace(f64::tanh),
            Activation::Logistic => z.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
            Activation::Identity => {}
        }
    }

    /// Derivative expressed through the activated value `a`
    fn derivative(&self, a: f64) -> f64 {
        match self {
            Activation::Relu => {
                if a > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => 1.0 - a * a,
            Activation::Logistic => a * (1.0 - a),
            Activation::Identity => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MlpParams {
    #[serde(default = "defaults::hidden_layer_sizes")]
    pub hidden_layer_sizes: Vec<usize>,

    #[serde(default = "defaults::activation")]
    pub activation: Activation,

    /// L2 penalty
    #[serde(default = "defaults::alpha")]
    pub alpha: f64,

    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    #[serde(default = "defaults::learning_rate_init")]
    pub learning_rate_init: f64,

    /// Maximum number of epochs
    #[serde(default = "defaults::max_iter")]
    pub max_iter: usize,

    #[serde(default = "defaults::tol")]
    pub tol: f64,

    #[serde(default = "defaults::n_iter_no_change")]
    pub n_iter_no_change: usize,

    #[serde(default = "defaults::shuffle")]
    pub shuffle: bool,

    #[serde(default)]
    pub random_state: u64,
}

mod defaults {
    use super::Activation;

    pub fn hidden_layer_sizes() -> Vec<usize> { vec![100] }
    pub fn activation() -> Activation { Activation::Relu }
    pub fn alpha() -> f64 { 1e-4 }
    pub fn batch_size() -> usize { 200 }
    pub fn learning_rate_init() -> f64 { 1e-3 }
    pub fn max_iter() -> usize { 200 }
    pub fn tol() -> f64 { 1e-4 }
    pub fn n_iter_no_change() -> usize { 10 }
    pub fn shuffle() -> bool { true }
}

impl Default for MlpParams {
    fn default() -> Self {
        Self {
            hidden_layer_sizes: defaults::hidden_layer_sizes(),
            activation: defaults::activation(),
            alpha: defaults::alpha(),
            batch_size: defaults::batch_size(),
            learning_rate_init: defaults::learning_rate_init(),
            max_iter: defaults::max_iter(),
            tol: defaults::tol(),
            n_iter_no_change: defaults::n_iter_no_change(),
            shuffle: defaults::shuffle(),
            random_state: 0,
        }
    }
}

impl MlpParams {
    pub fn validate(&self) -> ForceResult<()> {
        let invalid = |reason: &str| Err(ForceError::config("MLP", reason));
        if self.hidden_layer_sizes.contains(&0) {
            return invalid("hidden layer sizes must be positive");
        }
        if self.batch_size == 0 || self.max_iter == 0 {
            return invalid("batch_size and max_iter must be positive");
        }
        if !(self.learning_rate_init > 0.0) || self.alpha < 0.0 || self.tol < 0.0 {
            return invalid("learning_rate_init must be positive; alpha and tol non-negative");
        }
        Ok(())
    }
}

/// Fully connected layer with its Adam moments
#[derive(Debug, Clone)]
struct Layer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    m_weights: Array2<f64>,
    v_weights: Array2<f64>,
    m_bias: Array1<f64>,
    v_bias: Array1<f64>,
}

impl Layer {
    /// Glorot-uniform initialisation
    fn new(fan_in: usize, fan_out: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let factor = if activation == Activation::Logistic { 2.0 } else { 6.0 };
        let bound = (factor / (fan_in + fan_out) as f64).sqrt();
        Self {
            weights: Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-bound..bound)),
            bias: Array1::from_shape_fn(fan_out, |_| rng.gen_range(-bound..bound)),
            m_weights: Array2::zeros((fan_in, fan_out)),
            v_weights: Array2::zeros((fan_in, fan_out)),
            m_bias: Array1::zeros(fan_out),
            v_bias: Array1::zeros(fan_out),
        }
    }

    fn forward(&self, input: &ArrayView2<f64>) -> Array2<f64> {
        input.dot(&self.weights) + &self.bias
    }

    fn adam_step(&mut self, grad_w: &Array2<f64>, grad_b: &Array1<f64>, lr: f64, step: i32) {
        let correction1 = 1.0 - ADAM_BETA1.powi(step);
        let correction2 = 1.0 - ADAM_BETA2.powi(step);
        let rate = lr * correction2.sqrt() / correction1;

        self.m_weights.zip_mut_with(grad_w, |m, &g| *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g);
        self.v_weights.zip_mut_with(grad_w, |v, &g| *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g);
        self.m_bias.zip_mut_with(grad_b, |m, &g| *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g);
        self.v_bias.zip_mut_with(grad_b, |v, &g| *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g);

        ndarray::Zip::from(&mut self.weights)
            .and(&self.m_weights)
            .and(&self.v_weights)
            .for_each(|w, &m, &v| *w -= rate * m / (v.sqrt() + ADAM_EPSILON));
        ndarray::Zip::from(&mut self.bias)
            .and(&self.m_bias)
            .and(&self.v_bias)
            .for_each(|b, &m, &v| *b -= rate * m / (v.sqrt() + ADAM_EPSILON));
    }
}

#[derive(Debug, Clone)]
pub struct MlpRegressor {
    params: MlpParams,
    layers: Vec<Layer>,
    epochs_run: usize,
    final_loss: Option<f64>,
}

impl MlpRegressor {
    pub fn new(params: MlpParams) -> ForceResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            layers: Vec::new(),
            epochs_run: 0,
            final_loss: None,
        })
    }

    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }

    /// Mean training loss of the last epoch
    pub fn final_loss(&self) -> Option<f64> {
        self.final_loss
    }

    /// Activations of every layer; the last entry is the network output
    fn forward_all(&self, x: ArrayView2<f64>) -> Vec<Array2<f64>> {
        let mut activations: Vec<Array2<f64>> = Vec::with_capacity(self.layers.len());
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            let mut z = match activations.last() {
                Some(previous) => layer.forward(&previous.view()),
                None => layer.forward(&x),
            };
            if i != last {
                self.params.activation.apply(&mut z);
            }
            activations.push(z);
        }
        activations
    }

    /// One minibatch step; returns the batch loss
    fn train_batch(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>, step: i32) -> f64 {
        let n = x.nrows() as f64;
        let activations = self.forward_all(x);
        let Some(output) = activations.last() else {
            return 0.0;
        };

        let mut delta = output - &y;
        let mut loss = delta.mapv(|d| d * d).sum() / (2.0 * n);
        let penalty: f64 = self.layers.iter().map(|l| l.weights.mapv(|w| w * w).sum()).sum();
        loss += self.params.alpha * penalty / (2.0 * n);
        delta /= n;

        let activation = self.params.activation;
        let alpha = self.params.alpha;
        let lr = self.params.learning_rate_init;
        for index in (0..self.layers.len()).rev() {
            let input = if index == 0 {
                x.to_owned()
            } else {
                activations[index - 1].clone()
            };
            let grad_w = input.t().dot(&delta) + &(&self.layers[index].weights * (alpha / n));
            let grad_b = delta.sum_axis(Axis(0));

            if index > 0 {
                let mut next = delta.dot(&self.layers[index].weights.t());
                next.zip_mut_with(&activations[index - 1], |d, &a| *d *= activation.derivative(a));
                delta = next;
            }
            self.layers[index].adam_step(&grad_w, &grad_b, lr, step);
        }
        loss
    }
}

impl Regressor for MlpRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>, ctx: &FitContext) -> ForceResult<()> {
        check_fit_input(self.name(), &x, &y)?;

        let mut rng = StdRng::seed_from_u64(self.params.random_state);
        let mut sizes = vec![x.ncols()];
        sizes.extend_from_slice(&self.params.hidden_layer_sizes);
        sizes.push(y.ncols());
        self.layers = sizes
            .windows(2)
            .map(|pair| Layer::new(pair[0], pair[1], self.params.activation, &mut rng))
            .collect();

        let n = x.nrows();
        let batch_size = self.params.batch_size.min(n);
        let mut order: Vec<usize> = (0..n).collect();
        let mut best_loss = f64::INFINITY;
        let mut stalled = 0;
        let mut step = 0_i32;

        self.epochs_run = 0;
        for epoch in 0..self.params.max_iter {
            ctx.check(self.name())?;
            if self.params.shuffle {
                order.shuffle(&mut rng);
            }

            let mut epoch_loss = 0.0;
            for batch in order.chunks(batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                step = step.saturating_add(1);
                epoch_loss += self.train_batch(xb.view(), yb.view(), step) * batch.len() as f64;
            }
            epoch_loss /= n as f64;
            self.epochs_run = epoch + 1;
            self.final_loss = Some(epoch_loss);

            if !epoch_loss.is_finite() {
                return Err(ForceError::Fit {
                    predictor: self.name().to_string(),
                    reason: format!("loss diverged at epoch {}", epoch + 1),
                });
            }

            if epoch_loss > best_loss - self.params.tol {
                stalled += 1;
            } else {
                stalled = 0;
            }
            best_loss = best_loss.min(epoch_loss);
            if stalled >= self.params.n_iter_no_change {
                debug!(
                    "MLP converged after {} epochs (loss {:.6})",
                    self.epochs_run, epoch_loss
                );
                break;
            }
        }
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> ForceResult<Array2<f64>> {
        check_predict_input(self.name(), &x, self.layers.first().map(|l| l.weights.nrows()))?;
        self.forward_all(x).pop().ok_or_else(|| ForceError::Fit {
            predictor: self.name().to_string(),
            reason: "network has no layers".to_string(),
        })
    }

    fn name(&self) -> &str {
        "MLP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sine_data(n: usize) -> (Array2<f64>, Array2<f64>) {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / n as f64 * 2.0 - 1.0);
        let y = x.mapv(|v| 0.5 * v + 0.2);
        (x, y)
    }

    fn small_params() -> MlpParams {
        MlpParams {
            hidden_layer_sizes: vec![8],
            activation: Activation::Tanh,
            learning_rate_init: 0.01,
            tol: 1e-7,
            max_iter: 300,
            batch_size: 16,
            ..MlpParams::default()
        }
    }

    #[test]
    fn test_learns_linear_target() {
        let (x, y) = sine_data(64);
        let mut mlp = MlpRegressor::new(small_params()).unwrap();
        mlp.fit(x.view(), y.view(), &FitContext::unbounded()).unwrap();

        let predicted = mlp.predict(x.view()).unwrap();
        let mse = (&predicted - &y).mapv(|e| e * e).mean().unwrap();
        assert!(mse < 0.01, "mse = {}", mse);
        assert_eq!(predicted.dim(), y.dim());
    }

    #[test]
    fn test_seeded_fit_is_deterministic() {
        let (x, y) = sine_data(32);
        let mut a = MlpRegressor::new(small_params()).unwrap();
        let mut b = MlpRegressor::new(small_params()).unwrap();
        a.fit(x.view(), y.view(), &FitContext::unbounded()).unwrap();
        b.fit(x.view(), y.view(), &FitContext::unbounded()).unwrap();

        assert_eq!(a.predict(x.view()).unwrap(), b.predict(x.view()).unwrap());
    }

    #[test]
    fn test_budget_overrun() {
        let (x, y) = sine_data(32);
        let mut mlp = MlpRegressor::new(small_params()).unwrap();
        let ctx = FitContext::new(Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));

        assert!(matches!(
            mlp.fit(x.view(), y.view(), &ctx),
            Err(ForceError::FitBudgetExceeded { .. })
        ));
    }

    #[test]
    fn test_invalid_params() {
        let params = MlpParams {
            hidden_layer_sizes: vec![0],
            ..MlpParams::default()
        };
        assert!(MlpRegressor::new(params).is_err());
    }

    #[test]
    fn test_activation_derivatives() {
        assert_eq!(Activation::Relu.derivative(2.0), 1.0);
        assert_eq!(Activation::Relu.derivative(0.0), 0.0);
        assert!((Activation::Tanh.derivative(0.5) - 0.75).abs() < 1e-12);
        assert!((Activation::Logistic.derivative(0.5) - 0.25).abs() < 1e-12);
    }
}
