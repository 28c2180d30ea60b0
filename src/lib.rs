//! Fully-connected neural network for MNIST digits
//!
//! A multilayer perceptron trained with mini-batch stochastic gradient
//! descent and backpropagation, with per-layer dropout and optional weight
//! decay. Neurons live in per-layer arenas and synapses refer to them by
//! index.
//!
//! # Modules
//!
//! - `layers`: synapses, neurons and layers of the network graph
//! - `network`: forward/backward passes, training, evaluation and inference loops, parameter I/O
//! - `architecture`: topology text format and the network builder
//! - `cost`: output-layer cost functions
//! - `optimizers`: SGD update rule and weight-decay regularization
//! - `utils`: RNG, activation functions, weight initialization
//! - `sink`: training and inference result stream
//! - `mnist`: IDX image/label reader
//! - `render`: text-art rendering of digits
//! - `config`: JSON configuration
//! - `error`: crate error type
//!
//! # Example
//!
//! ```
//! use nnet::architecture::NetworkBuilder;
//! use nnet::mnist::Image;
//! use nnet::network::HyperParameters;
//! use nnet::sink::NullSink;
//!
//! let mut net = NetworkBuilder::new(HyperParameters::default())
//!     .seed(Some(1))
//!     .input_neurons(4)
//!     .output_neurons(2)
//!     .build_from_str("input\nfullyConnected neuronsNumber=3\noutput")
//!     .unwrap();
//!
//! let images = vec![
//!     Image::new(0, vec![255, 255, 0, 0], 0),
//!     Image::new(1, vec![0, 0, 255, 255], 1),
//! ];
//! let report = net.train(2, 1, &images, &images, &mut NullSink).unwrap();
//! assert!(report.train_cost_average.is_finite());
//! ```

pub mod architecture;
pub mod config;
pub mod cost;
pub mod error;
pub mod layers;
pub mod mnist;
pub mod network;
pub mod optimizers;
pub mod render;
pub mod sink;
pub mod utils;

pub use architecture::{NetworkBuilder, Topology};
pub use error::{NetError, Result};
pub use network::{HyperParameters, Mode, Network};
