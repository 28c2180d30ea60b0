//! Configuration structures for training, inference and the viewer
//!
//! Settings are read from JSON files with camelCase keys. Every key is
//! optional; missing keys take the defaults listed on each field. Command-line
//! flags of the binaries override file values after loading.
//!
//! # Example
//!
//! ```json
//! {
//!   "networkFile": "mnist.network",
//!   "costFunction": "crossEntropy",
//!   "regularization": "l2",
//!   "weightDecayRate": 5.0,
//!   "weightInitialization": "narrow",
//!   "trainImagesNumber": 50000,
//!   "epochsNumber": 30,
//!   "learningRate": 0.5
//! }
//! ```

use crate::cost::CostFunction;
use crate::error::{NetError, Result};
use crate::network::HyperParameters;
use crate::optimizers::Regularization;
use crate::utils::WeightInitialization;
use log::info;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File loaded before any explicit configuration, if present.
pub const DEFAULT_CONFIG_FILE: &str = "default.json";

/// Settings of the `nnet` train and infer commands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Topology file (default `default.network`). A missing file means the
    /// bare input -> output topology when training.
    pub network_file: PathBuf,
    /// Parameter file read before and written after training (default `default.parameters`)
    pub parameters_file: PathBuf,
    /// `quadratic` (default) or `crossEntropy`
    pub cost_function: CostFunction,
    /// `null` (default), `l1` or `l2`
    pub regularization: Regularization,
    /// Decay rate λ (default 0.1)
    pub weight_decay_rate: f64,
    /// `broad` (default) or `narrow`
    pub weight_initialization: WeightInitialization,

    pub train_images_file: PathBuf,
    pub train_labels_file: PathBuf,
    pub train_images_offset: usize,
    /// Default 1000
    pub train_images_number: usize,

    pub eval_images_file: PathBuf,
    pub eval_labels_file: PathBuf,
    pub eval_images_offset: usize,
    /// Default 100
    pub eval_images_number: usize,

    /// Restore parameters before training when the file exists (default true)
    pub read_parameters: bool,
    /// Default 10
    pub epochs_number: usize,
    /// Default 10
    pub batch_size: usize,
    /// Default 5.0
    pub learning_rate: f64,

    pub infer_images_file: PathBuf,
    pub infer_labels_file: PathBuf,
    pub infer_images_offset: usize,
    /// Default 100
    pub infer_images_number: usize,

    /// Fixed RNG seed; unset seeds from the clock
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            network_file: PathBuf::from("default.network"),
            parameters_file: PathBuf::from("default.parameters"),
            cost_function: CostFunction::Quadratic,
            regularization: Regularization::Null,
            weight_decay_rate: 0.1,
            weight_initialization: WeightInitialization::Broad,
            train_images_file: PathBuf::from("data/train.images"),
            train_labels_file: PathBuf::from("data/train.labels"),
            train_images_offset: 0,
            train_images_number: 1000,
            eval_images_file: PathBuf::from("data/infer.images"),
            eval_labels_file: PathBuf::from("data/infer.labels"),
            eval_images_offset: 0,
            eval_images_number: 100,
            read_parameters: true,
            epochs_number: 10,
            batch_size: 10,
            learning_rate: 5.0,
            infer_images_file: PathBuf::from("data/infer.images"),
            infer_labels_file: PathBuf::from("data/infer.labels"),
            infer_images_offset: 0,
            infer_images_number: 100,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Checks that:
    /// - `learningRate` is positive and finite
    /// - `weightDecayRate` is non-negative and finite
    /// - `batchSize`, `epochsNumber` and `trainImagesNumber` are at least 1
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(NetError::config(format!(
                "learningRate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.weight_decay_rate.is_finite() && self.weight_decay_rate >= 0.0) {
            return Err(NetError::config(format!(
                "weightDecayRate must be non-negative, got {}",
                self.weight_decay_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(NetError::config("batchSize must be at least 1"));
        }
        if self.epochs_number == 0 {
            return Err(NetError::config("epochsNumber must be at least 1"));
        }
        if self.train_images_number == 0 {
            return Err(NetError::config("trainImagesNumber must be at least 1"));
        }
        Ok(())
    }

    pub fn hyper_parameters(&self) -> HyperParameters {
        HyperParameters {
            cost_function: self.cost_function,
            regularization: self.regularization,
            weight_decay_rate: self.weight_decay_rate,
            learning_rate: self.learning_rate,
        }
    }
}

/// Settings of the `infview` viewer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ViewConfig {
    pub infer_images_file: PathBuf,
    pub infer_labels_file: PathBuf,
    /// Show only misclassified images (default true)
    pub only_mistake: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            infer_images_file: PathBuf::from("data/infer.images"),
            infer_labels_file: PathBuf::from("data/infer.labels"),
            only_mistake: true,
        }
    }
}

/// Loads a training configuration from a JSON file and validates it.
///
/// # Examples
///
/// ```no_run
/// use nnet::config::load_config;
///
/// let cfg = load_config("mnist.json").unwrap();
/// assert!(cfg.learning_rate > 0.0);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrainingConfig> {
    let config: TrainingConfig = read_json(path.as_ref())?;
    config.validate()?;
    Ok(config)
}

pub fn load_view_config<P: AsRef<Path>>(path: P) -> Result<ViewConfig> {
    read_json(path.as_ref())
}

/// Load `path` if given, else [`DEFAULT_CONFIG_FILE`] if it exists, else the
/// defaults. Not validated, so command-line overrides can still apply.
pub fn resolve<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match path {
        Some(path) => read_json(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => read_json(Path::new(DEFAULT_CONFIG_FILE)),
        None => Ok(T::default()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    let config = serde_json::from_str(&contents)?;
    info!("loaded configuration from {}", path.display());
    Ok(config)
}
