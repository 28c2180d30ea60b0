//! Network topology description and the builder that wires it
//!
//! A topology is a small line-oriented text format, one layer per line:
//!
//! ```text
//! # 784 inputs, two hidden layers, 10 outputs
//! input dropoutRatio=0.2
//! fullyConnected neuronsNumber=100 dropoutRatio=0.5
//! fullyConnected neuronsNumber=30 activation=tanh
//! output
//! ```
//!
//! Tokens are separated by spaces or tabs. Blank lines and lines whose first
//! token starts with `#` are ignored. Supported layer types:
//!
//! - **input**: optional `dropoutRatio` (default 0.0)
//! - **fullyConnected**: optional `neuronsNumber` (default 30), `dropoutRatio`
//!   (default 0.0) and `activation` (default `sigmoid`)
//! - **output**: optional `activation` (default `sigmoid`); never drops out
//!
//! Input and output widths are not part of the text; the [`NetworkBuilder`]
//! supplies them.

use crate::error::{NetError, Result};
use crate::layers::Layer;
use crate::network::{HyperParameters, Network};
use crate::utils::{Activation, SimpleRng, WeightInitialization};
use log::info;
use std::fs;
use std::path::Path;

pub const DEFAULT_INPUT_NEURONS: usize = crate::mnist::IMAGE_AREA;
pub const DEFAULT_OUTPUT_NEURONS: usize = crate::mnist::LABEL_VALUES_NUMBER;
pub const DEFAULT_HIDDEN_NEURONS: usize = 30;

/// One layer of a topology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerSpec {
    Input {
        dropout_ratio: f64,
    },
    FullyConnected {
        neurons_number: usize,
        dropout_ratio: f64,
        activation: Activation,
    },
    Output {
        activation: Activation,
    },
}

impl LayerSpec {
    fn name(&self) -> &'static str {
        match self {
            LayerSpec::Input { .. } => "input",
            LayerSpec::FullyConnected { .. } => "fullyConnected",
            LayerSpec::Output { .. } => "output",
        }
    }

    fn validate(&self, line: usize) -> Result<()> {
        let dropout_ratio = match *self {
            LayerSpec::Input { dropout_ratio } => dropout_ratio,
            LayerSpec::FullyConnected {
                neurons_number,
                dropout_ratio,
                ..
            } => {
                if neurons_number == 0 {
                    return Err(NetError::topology(
                        line,
                        "neuronsNumber must be at least 1, got 0",
                    ));
                }
                dropout_ratio
            }
            LayerSpec::Output { .. } => 0.0,
        };
        if !(0.0..1.0).contains(&dropout_ratio) {
            return Err(NetError::topology(
                line,
                format!("dropoutRatio must be in [0, 1), got {}", dropout_ratio),
            ));
        }
        Ok(())
    }
}

/// An ordered, validated list of layers: one input, any number of hidden
/// layers, one output.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    layers: Vec<LayerSpec>,
    /// 1-based source line of each layer, for error messages.
    lines: Vec<usize>,
}

impl Default for Topology {
    /// Bare input -> output network.
    fn default() -> Self {
        Self {
            layers: vec![
                LayerSpec::Input { dropout_ratio: 0.0 },
                LayerSpec::Output {
                    activation: Activation::Sigmoid,
                },
            ],
            lines: vec![1, 2],
        }
    }
}

impl Topology {
    /// Validate a programmatically assembled layer list.
    pub fn new(layers: Vec<LayerSpec>) -> Result<Self> {
        let lines = (1..=layers.len()).collect();
        let topology = Self { layers, lines };
        topology.validate()?;
        Ok(topology)
    }

    /// Parse topology text. Text without any layer line yields the default topology.
    ///
    /// # Examples
    ///
    /// ```
    /// use nnet::architecture::{LayerSpec, Topology};
    ///
    /// let topology = Topology::parse("input\nfullyConnected neuronsNumber=4\noutput\n").unwrap();
    /// assert_eq!(topology.layers().len(), 3);
    /// assert!(matches!(
    ///     topology.layers()[1],
    ///     LayerSpec::FullyConnected { neurons_number: 4, .. }
    /// ));
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut layers = Vec::new();
        let mut lines = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let mut tokens = raw
                .trim_end_matches('\r')
                .split([' ', '\t'])
                .filter(|t| !t.is_empty());
            let Some(layer_type) = tokens.next() else {
                continue;
            };
            if layer_type.starts_with('#') {
                continue;
            }
            let options: Vec<(&str, &str)> = tokens
                .map(|t| {
                    t.split_once('=').ok_or_else(|| {
                        NetError::topology(line, format!("expected key=value, got '{}'", t))
                    })
                })
                .collect::<Result<_>>()?;
            layers.push(parse_layer(layer_type, &options, line)?);
            lines.push(line);
        }

        if layers.is_empty() {
            return Ok(Self::default());
        }
        let topology = Self { layers, lines };
        topology.validate()?;
        Ok(topology)
    }

    /// Read and parse a topology file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// Checks that:
    /// - there are at least two layers
    /// - the first is `input`, the last is `output`, the rest `fullyConnected`
    /// - every layer's own values are in range
    fn validate(&self) -> Result<()> {
        if self.layers.len() < 2 {
            return Err(NetError::topology(
                self.lines.first().copied().unwrap_or(0),
                "a network needs at least an input and an output layer",
            ));
        }
        let last = self.layers.len() - 1;
        for (i, (spec, &line)) in self.layers.iter().zip(&self.lines).enumerate() {
            let (expected, ok) = match (i, spec) {
                (0, LayerSpec::Input { .. }) => ("input", true),
                (0, _) => ("input", false),
                (i, LayerSpec::Output { .. }) if i == last => ("output", true),
                (i, _) if i == last => ("output", false),
                (_, LayerSpec::FullyConnected { .. }) => ("fullyConnected", true),
                _ => ("fullyConnected", false),
            };
            if !ok {
                return Err(NetError::topology(
                    line,
                    format!("expected {} layer, got {}", expected, spec.name()),
                ));
            }
            spec.validate(line)?;
        }
        Ok(())
    }
}

fn parse_layer(layer_type: &str, options: &[(&str, &str)], line: usize) -> Result<LayerSpec> {
    let spec = match layer_type {
        "input" => {
            let mut dropout_ratio = 0.0;
            for &(key, value) in options {
                match key {
                    "dropoutRatio" => dropout_ratio = parse_value(key, value, line)?,
                    _ => return Err(unknown_option(layer_type, key, line)),
                }
            }
            LayerSpec::Input { dropout_ratio }
        }
        "fullyConnected" => {
            let mut neurons_number = DEFAULT_HIDDEN_NEURONS;
            let mut dropout_ratio = 0.0;
            let mut activation = Activation::Sigmoid;
            for &(key, value) in options {
                match key {
                    "neuronsNumber" => neurons_number = parse_value(key, value, line)?,
                    "dropoutRatio" => dropout_ratio = parse_value(key, value, line)?,
                    "activation" => activation = parse_value(key, value, line)?,
                    _ => return Err(unknown_option(layer_type, key, line)),
                }
            }
            LayerSpec::FullyConnected {
                neurons_number,
                dropout_ratio,
                activation,
            }
        }
        "output" => {
            let mut activation = Activation::Sigmoid;
            for &(key, value) in options {
                match key {
                    "activation" => activation = parse_value(key, value, line)?,
                    _ => return Err(unknown_option(layer_type, key, line)),
                }
            }
            LayerSpec::Output { activation }
        }
        other => {
            return Err(NetError::topology(
                line,
                format!("unknown layer type '{}'", other),
            ))
        }
    };
    spec.validate(line)?;
    Ok(spec)
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, line: usize) -> Result<T> {
    value
        .parse()
        .map_err(|_| NetError::topology(line, format!("invalid value '{}' for {}", value, key)))
}

fn unknown_option(layer_type: &str, key: &str, line: usize) -> NetError {
    NetError::topology(
        line,
        format!("unknown option '{}' for {} layer", key, layer_type),
    )
}

/// Turns a [`Topology`] into a wired [`Network`].
///
/// Biases are drawn from a standard normal, weights from the configured
/// [`WeightInitialization`]. A fixed seed makes the result reproducible.
///
/// # Examples
///
/// ```
/// use nnet::architecture::NetworkBuilder;
/// use nnet::network::HyperParameters;
///
/// let net = NetworkBuilder::new(HyperParameters::default())
///     .seed(Some(7))
///     .input_neurons(4)
///     .output_neurons(2)
///     .build_from_str("input\nfullyConnected neuronsNumber=3\noutput")
///     .unwrap();
/// assert_eq!(net.parameter_count(), 3 * (1 + 4) + 2 * (1 + 3));
/// ```
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    hyper: HyperParameters,
    weight_initialization: WeightInitialization,
    seed: Option<u64>,
    input_neurons: usize,
    output_neurons: usize,
}

impl NetworkBuilder {
    pub fn new(hyper: HyperParameters) -> Self {
        Self {
            hyper,
            weight_initialization: WeightInitialization::default(),
            seed: None,
            input_neurons: DEFAULT_INPUT_NEURONS,
            output_neurons: DEFAULT_OUTPUT_NEURONS,
        }
    }

    pub fn weight_initialization(mut self, init: WeightInitialization) -> Self {
        self.weight_initialization = init;
        self
    }

    /// Seed for initialization and for the network's own RNG; `None` seeds from the clock.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn input_neurons(mut self, n: usize) -> Self {
        self.input_neurons = n;
        self
    }

    pub fn output_neurons(mut self, n: usize) -> Self {
        self.output_neurons = n;
        self
    }

    pub fn build(&self, topology: &Topology) -> Result<Network> {
        topology.validate()?;
        if self.input_neurons == 0 || self.output_neurons == 0 {
            return Err(NetError::config(format!(
                "input and output widths must be at least 1, got {} and {}",
                self.input_neurons, self.output_neurons
            )));
        }

        let mut rng = self.seed.map_or_else(SimpleRng::from_time, SimpleRng::new);
        let mut layers: Vec<Layer> = Vec::with_capacity(topology.layers().len());
        for spec in topology.layers() {
            layers.push(match *spec {
                LayerSpec::Input { dropout_ratio } => Layer::input(self.input_neurons, dropout_ratio),
                LayerSpec::FullyConnected {
                    neurons_number,
                    dropout_ratio,
                    activation,
                } => Layer::hidden(neurons_number, dropout_ratio, activation, &mut rng),
                LayerSpec::Output { activation } => {
                    Layer::output(self.output_neurons, activation, &mut rng)
                }
            });
        }
        for l in 1..layers.len() {
            let (before, after) = layers.split_at_mut(l);
            after[0].connect(l, &mut before[l - 1], l - 1, self.weight_initialization, &mut rng);
        }

        let network = Network::new(layers, self.hyper, rng);
        info!(
            "built network: layers {:?}, {} parameters, {} cost, {} regularization",
            network.layers().iter().map(Layer::len).collect::<Vec<_>>(),
            network.parameter_count(),
            self.hyper.cost_function,
            self.hyper.regularization
        );
        Ok(network)
    }

    pub fn build_from_str(&self, text: &str) -> Result<Network> {
        self.build(&Topology::parse(text)?)
    }

    pub fn build_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Network> {
        self.build(&Topology::load(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let text = "# header\n\n  \ninput\r\n\t# inline\noutput activation=softmax\n";
        let topology = Topology::parse(text).unwrap();
        assert_eq!(
            topology.layers(),
            &[
                LayerSpec::Input { dropout_ratio: 0.0 },
                LayerSpec::Output {
                    activation: Activation::Softmax
                }
            ]
        );
    }

    #[test]
    fn test_error_reports_line_number() {
        let err = Topology::parse("input\n\nfullyConnected neuronsNumber=0\noutput").unwrap_err();
        assert!(matches!(err, NetError::Topology { line: 3, .. }));
    }

    #[test]
    fn test_default_when_empty() {
        assert_eq!(Topology::parse("# nothing\n").unwrap(), Topology::default());
    }

    #[test]
    fn test_new_validates_order() {
        let err = Topology::new(vec![
            LayerSpec::Output {
                activation: Activation::Sigmoid,
            },
            LayerSpec::Input { dropout_ratio: 0.0 },
        ])
        .unwrap_err();
        assert!(matches!(err, NetError::Topology { line: 1, .. }));
    }

    #[test]
    fn test_build_wires_consecutive_layers() {
        let net = NetworkBuilder::new(HyperParameters::default())
            .seed(Some(3))
            .input_neurons(5)
            .output_neurons(3)
            .build_from_str("input\nfullyConnected neuronsNumber=4\noutput")
            .unwrap();
        let sizes: Vec<usize> = net.layers().iter().map(Layer::len).collect();
        assert_eq!(sizes, vec![5, 4, 3]);
        for n in net.layers()[2].neurons() {
            assert_eq!(n.incoming().len(), 4);
            assert!(n.incoming().iter().all(|s| s.source().layer == 1));
        }
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let builder = NetworkBuilder::new(HyperParameters::default())
            .seed(Some(99))
            .input_neurons(6)
            .output_neurons(2);
        let a = builder.build(&Topology::default()).unwrap();
        let b = builder.build(&Topology::default()).unwrap();
        assert_eq!(a.parameters(), b.parameters());
    }
}
