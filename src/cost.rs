//! Output-layer cost functions.
//!
//! A cost function scores one output neuron against its desired value and
//! seeds the backpropagation error at the output layer.

use crate::utils::Activation;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CostFunction {
    /// `0.5 * (output - desired)^2`
    #[default]
    Quadratic,
    /// `-(d ln(o) + (1 - d) ln(1 - o))`, unclamped: an output of exactly 0 or 1
    /// yields an infinite cost.
    CrossEntropy,
}

impl CostFunction {
    /// Cost contributed by one output neuron.
    pub fn neuron_cost(&self, output: f64, desired: f64) -> f64 {
        match self {
            CostFunction::Quadratic => {
                let error = output - desired;
                0.5 * error * error
            }
            CostFunction::CrossEntropy => {
                -(desired * output.ln() + (1.0 - desired) * (1.0 - output).ln())
            }
        }
    }

    /// Error term seeded at an output neuron for backpropagation.
    ///
    /// Quadratic cost multiplies by the activation derivative at `input`.
    /// Cross-entropy drops that factor, which is exact for sigmoid outputs.
    pub fn output_error(
        &self,
        output: f64,
        input: f64,
        desired: f64,
        activation: Activation,
        siblings: &[f64],
    ) -> f64 {
        match self {
            CostFunction::Quadratic => (output - desired) * activation.derivative(input, siblings),
            CostFunction::CrossEntropy => output - desired,
        }
    }
}

impl FromStr for CostFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quadratic" => Ok(CostFunction::Quadratic),
            "crossEntropy" => Ok(CostFunction::CrossEntropy),
            other => Err(format!(
                "unknown cost function '{}' (expected quadratic or crossEntropy)",
                other
            )),
        }
    }
}

impl fmt::Display for CostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostFunction::Quadratic => f.write_str("quadratic"),
            CostFunction::CrossEntropy => f.write_str("crossEntropy"),
        }
    }
}
