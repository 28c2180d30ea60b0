//! Activation functions for neural networks
//!
//! Every activation maps into [0, 1]:
//! - Sigmoid: `1 / (1 + exp(-x))`
//! - Tanh: hyperbolic tangent rescaled to [0, 1], `(1 + tanh(x / 2)) / 2`
//! - Softmax: layer-wide, each output depends on the pre-activations of all
//!   live neurons in the same layer
//!
//! Pointwise variants ignore the `siblings` argument. For softmax, `siblings`
//! holds the pre-activations of every live neuron in the layer, the neuron's
//! own included.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Activation {
    #[default]
    Sigmoid,
    Tanh,
    Softmax,
}

impl Activation {
    /// Output for one neuron with pre-activation `input`.
    pub fn output(&self, input: f64, siblings: &[f64]) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid(input),
            Activation::Tanh => 0.5 * (1.0 + (0.5 * input).tanh()),
            Activation::Softmax => {
                let max = max_input(siblings);
                (input - max).exp() / exp_sum(siblings, max)
            }
        }
    }

    /// Derivative of the output with respect to the neuron's own pre-activation.
    pub fn derivative(&self, input: f64, siblings: &[f64]) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid_derivative(sigmoid(input)),
            Activation::Tanh => {
                let t = (0.5 * input).tanh();
                0.25 * (1.0 - t * t)
            }
            Activation::Softmax => {
                let o = self.output(input, siblings);
                o * (1.0 - o)
            }
        }
    }

    /// Outputs for a whole layer at once.
    ///
    /// Equivalent to calling [`Activation::output`] per element with `inputs`
    /// as siblings, but computes the softmax normalizer only once.
    pub fn outputs(&self, inputs: &[f64], outputs: &mut [f64]) {
        assert_eq!(inputs.len(), outputs.len(), "inputs/outputs length mismatch");
        match self {
            Activation::Softmax => {
                let max = max_input(inputs);
                let sum = exp_sum(inputs, max);
                for (out, &x) in outputs.iter_mut().zip(inputs) {
                    *out = (x - max).exp() / sum;
                }
            }
            _ => {
                for (out, &x) in outputs.iter_mut().zip(inputs) {
                    *out = self.output(x, inputs);
                }
            }
        }
    }

    /// Derivatives for a whole layer at once.
    pub fn derivatives(&self, inputs: &[f64], derivatives: &mut [f64]) {
        assert_eq!(
            inputs.len(),
            derivatives.len(),
            "inputs/derivatives length mismatch"
        );
        match self {
            Activation::Softmax => {
                self.outputs(inputs, derivatives);
                for d in derivatives.iter_mut() {
                    *d *= 1.0 - *d;
                }
            }
            _ => {
                for (d, &x) in derivatives.iter_mut().zip(inputs) {
                    *d = self.derivative(x, inputs);
                }
            }
        }
    }

    /// Whether each output depends only on the neuron's own pre-activation.
    pub fn is_pointwise(&self) -> bool {
        !matches!(self, Activation::Softmax)
    }
}

impl FromStr for Activation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "softmax" => Ok(Activation::Softmax),
            other => Err(format!(
                "unknown activation function '{}' (expected sigmoid, tanh or softmax)",
                other
            )),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Softmax => "softmax",
        };
        f.write_str(name)
    }
}

/// Sigmoid activation function.
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative assuming x = sigmoid(z).
///
/// Returns the derivative: x * (1 - x)
pub fn sigmoid_derivative(x: f64) -> f64 {
    x * (1.0 - x)
}

// Max-subtraction keeps exp() finite for large pre-activations.
fn max_input(inputs: &[f64]) -> f64 {
    inputs.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn exp_sum(inputs: &[f64], max: f64) -> f64 {
    inputs.iter().map(|&x| (x - max).exp()).sum()
}
