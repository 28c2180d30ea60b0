//! Weight decay policies.
//!
//! A regularization contributes a penalty to the reported cost and shrinks
//! every live weight at batch-update time, before the gradient step.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Regularization {
    #[default]
    Null,
    L1,
    L2,
}

impl Regularization {
    /// Penalty for one group of weights whose source layer loses a
    /// `dropout_ratio` fraction of its neurons to each training mask.
    ///
    /// Stored weights are trained against a masked source layer, so the
    /// penalty is computed on `weight * (1 - dropout_ratio)`, the weight the
    /// unmasked network effectively applies. The caller adds the penalty to a
    /// pass's cost sum before averaging over the pass's image count.
    pub fn weights_cost<I>(&self, weights: I, decay_rate: f64, dropout_ratio: f64) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let keep = 1.0 - dropout_ratio;
        match self {
            Regularization::Null => 0.0,
            Regularization::L1 => {
                decay_rate * weights.into_iter().map(|w| (w * keep).abs()).sum::<f64>()
            }
            Regularization::L2 => {
                (decay_rate / 2.0)
                    * weights
                        .into_iter()
                        .map(|w| {
                            let effective = w * keep;
                            effective * effective
                        })
                        .sum::<f64>()
            }
        }
    }

    /// Weight after decay, before the gradient step is subtracted.
    ///
    /// `images_number` is the full training-set size, not the batch size.
    pub fn decayed_weight(
        &self,
        weight: f64,
        learning_rate: f64,
        decay_rate: f64,
        images_number: usize,
    ) -> f64 {
        let shrink = learning_rate * decay_rate / images_number as f64;
        match self {
            Regularization::Null => weight,
            Regularization::L1 => weight - sign(weight) * shrink,
            Regularization::L2 => (1.0 - shrink) * weight,
        }
    }
}

// f64::signum(0.0) is 1.0; a zero weight must stay put under L1.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl FromStr for Regularization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(Regularization::Null),
            "l1" => Ok(Regularization::L1),
            "l2" => Ok(Regularization::L2),
            other => Err(format!(
                "unknown regularization '{}' (expected null, l1 or l2)",
                other
            )),
        }
    }
}

impl fmt::Display for Regularization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regularization::Null => f.write_str("null"),
            Regularization::L1 => f.write_str("l1"),
            Regularization::L2 => f.write_str("l2"),
        }
    }
}
