//! Parameter update rules
//!
//! Gradients accumulated over a batch are turned into new weights and biases
//! here. The update is plain mini-batch SGD; weight decay is a pluggable
//! [`Regularization`] that also contributes to the reported cost.
//!
//! # Available policies
//!
//! - `Null`: no decay
//! - `L1`: subtracts `sign(w) * η * λ / n`
//! - `L2`: multiplies by `1 - η * λ / n`
//!
//! with η the effective step, λ the decay rate and n the training-set size.

pub mod regularization;
pub mod sgd;

pub use regularization::Regularization;
pub use sgd::Sgd;
