//! Stochastic Gradient Descent (SGD) batch update rule
//!
//! At every batch boundary each live parameter moves against its accumulated
//! gradient:
//!
//! `b = b - η/m * ∂C/∂b`
//! `w = decay(w) - η/m * ∂C/∂w`
//!
//! where η is the learning rate, m the batch size and `decay` the
//! [`Regularization`] policy normalized by the training-set size.

use crate::optimizers::Regularization;

/// Vanilla SGD with weight decay.
///
/// # Example
///
/// ```
/// use nnet::optimizers::{Regularization, Sgd};
///
/// let sgd = Sgd::new(0.5, Regularization::Null, 0.0);
/// let step = sgd.step_size(10);
/// assert_eq!(step, 0.05);
/// assert_eq!(sgd.update_bias(1.0, 2.0, step), 0.9);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    learning_rate: f64,
    regularization: Regularization,
    weight_decay_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64, regularization: Regularization, weight_decay_rate: f64) -> Self {
        Self {
            learning_rate,
            regularization,
            weight_decay_rate,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Effective per-parameter step for one batch: the summed gradients are
    /// scaled by `learning_rate / batch_size`.
    pub fn step_size(&self, batch_size: usize) -> f64 {
        self.learning_rate / batch_size as f64
    }

    pub fn update_bias(&self, bias: f64, gradient: f64, step: f64) -> f64 {
        bias - step * gradient
    }

    /// Decay first, then descend.
    pub fn update_weight(&self, weight: f64, gradient: f64, step: f64, images_number: usize) -> f64 {
        self.regularization
            .decayed_weight(weight, step, self.weight_decay_rate, images_number)
            - step * gradient
    }
}
