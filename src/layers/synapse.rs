//! Weighted edges between neurons.
//!
//! Neurons live in per-layer arenas; edges address their endpoints by
//! `(layer, neuron)` index instead of by pointer. A synapse is stored once, in
//! its destination's incoming list. The source keeps a [`SynapseRef`] that
//! locates the same synapse from the other end.

/// Position of a neuron inside a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NeuronRef {
    pub layer: usize,
    pub neuron: usize,
}

impl NeuronRef {
    pub fn new(layer: usize, neuron: usize) -> Self {
        Self { layer, neuron }
    }
}

/// Outgoing edge as seen from its source: the destination neuron and the
/// index of the synapse within the destination's incoming list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynapseRef {
    pub destination: NeuronRef,
    pub slot: usize,
}

/// Directed weighted edge, owned by its destination neuron.
#[derive(Debug, Clone, PartialEq)]
pub struct Synapse {
    source: NeuronRef,
    weight: f64,
    weight_gradient: f64,
}

impl Synapse {
    pub fn new(source: NeuronRef, weight: f64) -> Self {
        Self {
            source,
            weight,
            weight_gradient: 0.0,
        }
    }

    pub fn source(&self) -> NeuronRef {
        self.source
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Gradient summed over the examples of the current batch.
    pub fn weight_gradient(&self) -> f64 {
        self.weight_gradient
    }

    pub fn clear_weight_gradient(&mut self) {
        self.weight_gradient = 0.0;
    }

    pub fn add_weight_gradient(&mut self, addend: f64) {
        self.weight_gradient += addend;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_accumulates_until_cleared() {
        let mut s = Synapse::new(NeuronRef::new(0, 3), 0.25);
        s.add_weight_gradient(1.5);
        s.add_weight_gradient(-0.5);
        assert_eq!(s.weight_gradient(), 1.0);
        s.clear_weight_gradient();
        assert_eq!(s.weight_gradient(), 0.0);
        assert_eq!(s.source(), NeuronRef::new(0, 3));
        assert_eq!(s.weight(), 0.25);
    }
}
