//! Initial synapse weight sampling.

use crate::utils::rng::SimpleRng;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How a new synapse picks its starting weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeightInitialization {
    /// Standard normal, N(0, 1).
    #[default]
    Broad,
    /// N(0, 1/sqrt(fan_in)), keeps wide layers out of saturation early on.
    #[serde(alias = "sharp")]
    Narrow,
}

impl WeightInitialization {
    /// Draw one weight for a synapse entering a neuron with `fan_in` inputs.
    pub fn sample(&self, fan_in: usize, rng: &mut SimpleRng) -> f64 {
        match self {
            WeightInitialization::Broad => rng.normal(0.0, 1.0),
            WeightInitialization::Narrow => rng.normal(0.0, 1.0 / (fan_in.max(1) as f64).sqrt()),
        }
    }
}

impl FromStr for WeightInitialization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "broad" => Ok(WeightInitialization::Broad),
            "narrow" | "sharp" => Ok(WeightInitialization::Narrow),
            other => Err(format!(
                "unknown weight initialization '{}' (expected broad or narrow)",
                other
            )),
        }
    }
}

impl fmt::Display for WeightInitialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightInitialization::Broad => f.write_str("broad"),
            WeightInitialization::Narrow => f.write_str("narrow"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn std_dev(init: WeightInitialization, fan_in: usize) -> f64 {
        let mut rng = SimpleRng::new(99);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| init.sample(fan_in, &mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        (samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
    }

    #[test]
    fn test_broad_is_unit_normal() {
        assert!((std_dev(WeightInitialization::Broad, 784) - 1.0).abs() < 0.03);
    }

    #[test]
    fn test_narrow_scales_with_fan_in() {
        // 1 / sqrt(100) = 0.1
        assert!((std_dev(WeightInitialization::Narrow, 100) - 0.1).abs() < 0.005);
    }

    #[test]
    fn test_sharp_alias() {
        assert_eq!(
            "sharp".parse::<WeightInitialization>(),
            Ok(WeightInitialization::Narrow)
        );
    }
}
