//! Tests for the topology format and the network builder
//!
//! This file tests:
//! - Option parsing and defaults
//! - Structural rules (layer kinds and order)
//! - Value validation with line numbers
//! - Building and wiring networks

use nnet::architecture::{LayerSpec, NetworkBuilder, Topology};
use nnet::error::NetError;
use nnet::layers::LayerKind;
use nnet::network::HyperParameters;
use nnet::utils::{Activation, WeightInitialization};
use std::fs;
use tempfile::tempdir;

fn topology_error_line(text: &str) -> usize {
    match Topology::parse(text) {
        Err(NetError::Topology { line, .. }) => line,
        other => panic!("expected topology error for {:?}, got {:?}", text, other),
    }
}

// ============================================================================
// Parsing Tests
// ============================================================================

mod parsing_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let topology = Topology::parse("input\nfullyConnected\noutput").unwrap();
        assert_eq!(
            topology.layers(),
            &[
                LayerSpec::Input { dropout_ratio: 0.0 },
                LayerSpec::FullyConnected {
                    neurons_number: 30,
                    dropout_ratio: 0.0,
                    activation: Activation::Sigmoid,
                },
                LayerSpec::Output {
                    activation: Activation::Sigmoid
                },
            ]
        );
    }

    #[test]
    fn test_all_options() {
        let text = "input dropoutRatio=0.2\n\
                    fullyConnected\tneuronsNumber=100  dropoutRatio=0.5 activation=tanh\n\
                    output activation=softmax\n";
        let topology = Topology::parse(text).unwrap();
        assert_eq!(
            topology.layers()[1],
            LayerSpec::FullyConnected {
                neurons_number: 100,
                dropout_ratio: 0.5,
                activation: Activation::Tanh,
            }
        );
        assert_eq!(
            topology.layers()[2],
            LayerSpec::Output {
                activation: Activation::Softmax
            }
        );
    }

    #[test]
    fn test_empty_text_is_default_topology() {
        assert_eq!(Topology::parse("").unwrap(), Topology::default());
        assert_eq!(Topology::parse("\n# only comments\n\n").unwrap().layers().len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mnist.network");
        fs::write(&path, "input\nfullyConnected neuronsNumber=12\noutput\n").unwrap();
        let topology = Topology::load(&path).unwrap();
        assert_eq!(topology.layers().len(), 3);
    }
}

// ============================================================================
// Validation Tests
// ============================================================================

mod validation_tests {
    use super::*;

    #[test]
    fn test_unknown_layer_type() {
        assert_eq!(topology_error_line("input\nconvolution\noutput"), 2);
    }

    #[test]
    fn test_unknown_option() {
        assert_eq!(topology_error_line("input size=3\noutput"), 1);
        assert_eq!(topology_error_line("input\noutput dropoutRatio=0.1"), 2);
    }

    #[test]
    fn test_malformed_values() {
        assert_eq!(topology_error_line("input dropoutRatio=half\noutput"), 1);
        assert_eq!(topology_error_line("input\nfullyConnected neuronsNumber=-1\noutput"), 2);
        assert_eq!(topology_error_line("input\nfullyConnected activation=relu\noutput"), 2);
        assert_eq!(topology_error_line("input dropoutRatio\noutput"), 1);
    }

    #[test]
    fn test_out_of_range_values() {
        assert_eq!(topology_error_line("input dropoutRatio=1.0\noutput"), 1);
        assert_eq!(topology_error_line("input dropoutRatio=-0.1\noutput"), 1);
        assert_eq!(
            topology_error_line("# net\ninput\nfullyConnected neuronsNumber=0\noutput"),
            3
        );
    }

    #[test]
    fn test_layer_order() {
        assert_eq!(topology_error_line("fullyConnected\noutput"), 1);
        assert_eq!(topology_error_line("input\nfullyConnected"), 2);
        assert_eq!(topology_error_line("input\noutput\noutput"), 2);
        assert_eq!(topology_error_line("input\ninput\noutput"), 2);
        assert_eq!(topology_error_line("input"), 1);
    }

    #[test]
    fn test_message_carries_offending_value() {
        let err = Topology::parse("input dropoutRatio=1.5\noutput").unwrap_err();
        assert!(err.to_string().contains("1.5"));
    }
}

// ============================================================================
// Builder Tests
// ============================================================================

mod builder_tests {
    use super::*;

    #[test]
    fn test_mnist_widths_by_default() {
        let net = NetworkBuilder::new(HyperParameters::default())
            .seed(Some(1))
            .build(&Topology::default())
            .unwrap();
        assert_eq!(net.input_size(), 784);
        assert_eq!(net.output_size(), 10);
        assert_eq!(net.parameter_count(), 10 * (1 + 784));
    }

    #[test]
    fn test_layer_kinds_and_ratios() {
        let net = NetworkBuilder::new(HyperParameters::default())
            .seed(Some(2))
            .input_neurons(8)
            .output_neurons(3)
            .build_from_str(
                "input dropoutRatio=0.1\nfullyConnected neuronsNumber=6 dropoutRatio=0.5\noutput",
            )
            .unwrap();
        let kinds: Vec<LayerKind> = net.layers().iter().map(|l| l.kind()).collect();
        assert_eq!(kinds, vec![LayerKind::Input, LayerKind::Hidden, LayerKind::Output]);
        assert_eq!(net.layers()[0].dropout_ratio(), 0.1);
        assert_eq!(net.layers()[1].dropout_ratio(), 0.5);
        assert_eq!(net.layers()[2].dropout_ratio(), 0.0);
        assert_eq!(net.layers()[0].activation(), None);
    }

    #[test]
    fn test_full_bipartite_wiring() {
        let net = NetworkBuilder::new(HyperParameters::default())
            .seed(Some(3))
            .input_neurons(5)
            .output_neurons(2)
            .build_from_str("input\nfullyConnected neuronsNumber=4\noutput")
            .unwrap();
        for n in net.layers()[0].neurons() {
            assert_eq!(n.outgoing().len(), 4);
        }
        for n in net.layers()[1].neurons() {
            assert_eq!(n.incoming().len(), 5);
            assert_eq!(n.outgoing().len(), 2);
        }
        for n in net.layers()[2].neurons() {
            assert_eq!(n.incoming().len(), 4);
            assert!(n.outgoing().is_empty());
        }
    }

    #[test]
    fn test_narrow_initialization_shrinks_weights() {
        let mean_abs_weight = |init| {
            let net = NetworkBuilder::new(HyperParameters::default())
                .seed(Some(4))
                .weight_initialization(init)
                .input_neurons(400)
                .output_neurons(10)
                .build(&Topology::default())
                .unwrap();
            let weights: Vec<f64> = net.layers()[1]
                .neurons()
                .iter()
                .flat_map(|n| n.incoming().iter().map(|s| s.weight().abs()))
                .collect();
            weights.iter().sum::<f64>() / weights.len() as f64
        };
        let broad = mean_abs_weight(WeightInitialization::Broad);
        let narrow = mean_abs_weight(WeightInitialization::Narrow);
        // sigma 1 vs 1/sqrt(400)
        assert!(broad > 0.7 && broad < 0.9);
        assert!(narrow < broad / 10.0);
    }

    #[test]
    fn test_zero_width_is_rejected() {
        let err = NetworkBuilder::new(HyperParameters::default())
            .input_neurons(0)
            .build(&Topology::default())
            .unwrap_err();
        assert!(matches!(err, NetError::Config(_)));
    }
}
