pub mod activations;
pub mod init;
pub mod rng;

pub use activations::Activation;
pub use init::WeightInitialization;
pub use rng::SimpleRng;
