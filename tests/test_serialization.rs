//! Tests for the binary parameter file
//!
//! Layout: little-endian f64, per non-input layer, per neuron, the bias then
//! the incoming weights in source order. No header.

use nnet::error::NetError;
use nnet::mnist::Image;
use nnet::network::{HyperParameters, Network};
use nnet::sink::NullSink;
use nnet::NetworkBuilder;
use std::fs;
use tempfile::tempdir;

const TOPOLOGY: &str = "input\nfullyConnected neuronsNumber=3\noutput";

fn build(seed: u64) -> Network {
    NetworkBuilder::new(HyperParameters::default())
        .seed(Some(seed))
        .input_neurons(4)
        .output_neurons(2)
        .build_from_str(TOPOLOGY)
        .unwrap()
}

fn decode(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

// ============================================================================
// Layout
// ============================================================================

mod layout_tests {
    use super::*;

    #[test]
    fn test_byte_length_matches_parameter_count() {
        let net = build(1);
        let mut bytes = Vec::new();
        net.write_parameters(&mut bytes).unwrap();
        assert_eq!(net.parameter_count(), 3 * (1 + 4) + 2 * (1 + 3));
        assert_eq!(bytes.len(), 8 * net.parameter_count());
    }

    #[test]
    fn test_bias_then_incoming_weights() {
        let mut net = build(2);
        let values: Vec<f64> = (0..net.parameter_count()).map(|i| i as f64).collect();
        net.set_parameters(&values).unwrap();

        let mut bytes = Vec::new();
        net.write_parameters(&mut bytes).unwrap();
        assert_eq!(decode(&bytes), values);

        let hidden = &net.layers()[1].neurons()[1];
        assert_eq!(hidden.bias(), Some(5.0));
        let weights: Vec<f64> = hidden.incoming().iter().map(|s| s.weight()).collect();
        assert_eq!(weights, vec![6.0, 7.0, 8.0, 9.0]);

        let output = &net.layers()[2].neurons()[0];
        assert_eq!(output.bias(), Some(15.0));
        assert_eq!(output.incoming()[2].weight(), 18.0);
    }
}

// ============================================================================
// Round Trip
// ============================================================================

mod round_trip_tests {
    use super::*;

    #[test]
    fn test_trained_parameters_round_trip_through_file() {
        let images = vec![
            Image::new(0, vec![255, 0, 255, 0], 0),
            Image::new(1, vec![0, 255, 0, 255], 1),
        ];
        let mut trained = build(3);
        trained.train(3, 1, &images, &images, &mut NullSink).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("net.parameters");
        trained.save_parameters(&path).unwrap();

        let mut restored = build(4);
        assert_ne!(restored.parameters(), trained.parameters());
        restored.load_parameters(&path).unwrap();
        assert_eq!(restored.parameters(), trained.parameters());
        assert_eq!(
            fs::metadata(&path).unwrap().len() as usize,
            8 * trained.parameter_count()
        );
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let source = build(5);
        let mut bytes = Vec::new();
        source.write_parameters(&mut bytes).unwrap();
        bytes.extend_from_slice(&[1, 2, 3, 4, 5]);

        let mut net = build(6);
        net.read_parameters(bytes.as_slice()).unwrap();
        assert_eq!(net.parameters(), source.parameters());
    }
}

// ============================================================================
// Errors
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_truncated_stream_is_fatal_and_atomic() {
        let source = build(7);
        let mut bytes = Vec::new();
        source.write_parameters(&mut bytes).unwrap();
        bytes.truncate(8 * 10 + 4);

        let mut net = build(8);
        let before = net.parameters();
        match net.read_parameters(bytes.as_slice()) {
            Err(NetError::TruncatedParameters { expected, read }) => {
                assert_eq!(expected, 23);
                assert_eq!(read, 10);
            }
            other => panic!("expected truncated parameters, got {:?}", other),
        }
        assert_eq!(net.parameters(), before);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let mut net = build(9);
        let err = net
            .load_parameters(dir.path().join("absent.parameters"))
            .unwrap_err();
        assert!(matches!(err, NetError::Io(_)));
    }

    #[test]
    fn test_set_parameters_checks_length() {
        let mut net = build(10);
        let err = net.set_parameters(&[0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            NetError::ShapeMismatch {
                expected: 23,
                actual: 3
            }
        ));
    }
}
