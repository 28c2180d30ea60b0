//! Layers: index-stable neuron arenas sharing one activation and one dropout ratio.

use crate::layers::neuron::{LayerKind, Neuron};
use crate::layers::synapse::{NeuronRef, Synapse, SynapseRef};
use crate::utils::{Activation, SimpleRng, WeightInitialization};

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    kind: LayerKind,
    neurons: Vec<Neuron>,
    dropout_ratio: f64,
    activation: Option<Activation>,
}

impl Layer {
    /// Input layer of `size` neurons.
    pub fn input(size: usize, dropout_ratio: f64) -> Self {
        Self {
            kind: LayerKind::Input,
            neurons: (0..size).map(|_| Neuron::input()).collect(),
            dropout_ratio,
            activation: None,
        }
    }

    /// Hidden layer whose biases are drawn from a standard normal.
    pub fn hidden(
        size: usize,
        dropout_ratio: f64,
        activation: Activation,
        rng: &mut SimpleRng,
    ) -> Self {
        Self {
            kind: LayerKind::Hidden,
            neurons: (0..size)
                .map(|_| Neuron::hidden(rng.normal(0.0, 1.0)))
                .collect(),
            dropout_ratio,
            activation: Some(activation),
        }
    }

    /// Output layer; never drops out.
    pub fn output(size: usize, activation: Activation, rng: &mut SimpleRng) -> Self {
        Self {
            kind: LayerKind::Output,
            neurons: (0..size)
                .map(|_| Neuron::output_neuron(rng.normal(0.0, 1.0)))
                .collect(),
            dropout_ratio: 0.0,
            activation: Some(activation),
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    pub fn dropout_ratio(&self) -> f64 {
        self.dropout_ratio
    }

    /// Activation function; `None` for the input layer.
    pub fn activation(&self) -> Option<Activation> {
        self.activation
    }

    /// Fully connect `source` (at network position `source_index`) to this
    /// layer (at `self_index`).
    ///
    /// Pairs are visited source-major, so every destination's incoming list
    /// ends up in source order. Each weight is drawn from `init` with this
    /// layer's fan-in.
    pub fn connect(
        &mut self,
        self_index: usize,
        source: &mut Layer,
        source_index: usize,
        init: WeightInitialization,
        rng: &mut SimpleRng,
    ) {
        let fan_in = source.len();
        for (src, source_neuron) in source.neurons.iter_mut().enumerate() {
            for (dest, dest_neuron) in self.neurons.iter_mut().enumerate() {
                let weight = init.sample(fan_in, rng);
                let synapse = Synapse::new(NeuronRef::new(source_index, src), weight);
                let Some(slot) = dest_neuron.push_incoming(synapse) else {
                    continue;
                };
                source_neuron.push_outgoing(SynapseRef {
                    destination: NeuronRef::new(self_index, dest),
                    slot,
                });
            }
        }
    }

    /// Neurons a training mask drops: `round(len * dropout_ratio)`, capped so
    /// at least one neuron stays live. Always 0 for the output layer.
    pub fn mask_size(&self) -> usize {
        if self.kind == LayerKind::Output || self.is_empty() {
            return 0;
        }
        let amount = (self.len() as f64 * self.dropout_ratio).round() as usize;
        amount.min(self.len() - 1)
    }

    /// Fraction of neurons live under a training mask. Evaluation scales
    /// outputs by this so the next layer sees the same expected signal.
    pub fn keep_ratio(&self) -> f64 {
        if self.is_empty() {
            return 1.0;
        }
        (self.len() - self.mask_size()) as f64 / self.len() as f64
    }

    /// Mark a fresh random subset of [`Layer::mask_size`] neurons as dropped.
    pub fn drop_neurons(&mut self, rng: &mut SimpleRng) {
        let amount = self.mask_size();
        if amount == 0 {
            return;
        }
        for i in rng.sample_indices(self.len(), amount) {
            self.neurons[i].set_dropped(true);
        }
    }

    pub fn restore_neurons(&mut self) {
        for n in &mut self.neurons {
            n.set_dropped(false);
        }
    }

    pub fn dropped_count(&self) -> usize {
        self.neurons.iter().filter(|n| n.is_dropped()).count()
    }

    /// Number of trainable values: one bias plus one weight per incoming synapse, per neuron.
    pub fn parameter_count(&self) -> usize {
        match self.kind {
            LayerKind::Input => 0,
            _ => self.neurons.iter().map(|n| 1 + n.incoming().len()).sum(),
        }
    }

    /// Append this layer's parameters in file order: per neuron, bias then
    /// incoming weights.
    pub(crate) fn collect_parameters(&self, out: &mut Vec<f64>) {
        for n in &self.neurons {
            if let Some(bias) = n.bias() {
                out.push(bias);
                out.extend(n.incoming().iter().map(Synapse::weight));
            }
        }
    }

    /// Same layout as [`Layer::collect_parameters`], with gradient accumulators.
    pub(crate) fn collect_gradients(&self, out: &mut Vec<f64>) {
        for n in &self.neurons {
            if let Some(gradient) = n.bias_gradient() {
                out.push(gradient);
                out.extend(n.incoming().iter().map(Synapse::weight_gradient));
            }
        }
    }

    /// Overwrite parameters from `values` in file order; returns how many were consumed.
    pub(crate) fn assign_parameters(&mut self, values: &[f64]) -> usize {
        let mut cursor = 0;
        for n in &mut self.neurons {
            let Some((state, incoming)) = n.state_and_incoming_mut() else {
                continue;
            };
            state.bias = values[cursor];
            cursor += 1;
            for synapse in incoming.iter_mut() {
                synapse.set_weight(values[cursor]);
                cursor += 1;
            }
        }
        cursor
    }

    pub(crate) fn clear_gradients(&mut self) {
        for n in &mut self.neurons {
            if let Some((state, incoming)) = n.state_and_incoming_mut() {
                state.bias_gradient = 0.0;
                for synapse in incoming.iter_mut() {
                    synapse.clear_weight_gradient();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wired_pair(seed: u64) -> (Layer, Layer) {
        let mut rng = SimpleRng::new(seed);
        let mut input = Layer::input(3, 0.0);
        let mut output = Layer::output(2, Activation::Sigmoid, &mut rng);
        output.connect(1, &mut input, 0, WeightInitialization::Broad, &mut rng);
        (input, output)
    }

    #[test]
    fn test_connect_is_full_bipartite() {
        let (input, output) = wired_pair(1);

        for n in input.neurons() {
            assert_eq!(n.outgoing().len(), 2);
        }
        for n in output.neurons() {
            assert_eq!(n.incoming().len(), 3);
        }
        assert_eq!(output.parameter_count(), 2 * (1 + 3));
        assert_eq!(input.parameter_count(), 0);
    }

    #[test]
    fn test_incoming_in_source_order() {
        let (_, output) = wired_pair(2);
        for n in output.neurons() {
            let sources: Vec<usize> = n.incoming().iter().map(|s| s.source().neuron).collect();
            assert_eq!(sources, vec![0, 1, 2]);
        }
    }

    #[test]
    fn test_outgoing_refs_resolve_back_to_source() {
        let (input, output) = wired_pair(3);
        for (src, n) in input.neurons().iter().enumerate() {
            for edge in n.outgoing() {
                assert_eq!(edge.destination.layer, 1);
                let synapse = &output.neurons()[edge.destination.neuron].incoming()[edge.slot];
                assert_eq!(synapse.source(), NeuronRef::new(0, src));
            }
        }
    }

    #[test]
    fn test_drop_neurons_rounds_ratio() {
        let mut rng = SimpleRng::new(4);
        let mut layer = Layer::hidden(10, 0.25, Activation::Sigmoid, &mut rng);
        // round(2.5) = 3
        layer.drop_neurons(&mut rng);
        assert_eq!(layer.dropped_count(), 3);
        layer.restore_neurons();
        assert_eq!(layer.dropped_count(), 0);
    }

    #[test]
    fn test_keep_ratio_follows_mask_size() {
        let mut rng = SimpleRng::new(7);
        let layer = Layer::hidden(7, 0.5, Activation::Sigmoid, &mut rng);
        // round(3.5) = 4 dropped, 3 of 7 kept
        assert_eq!(layer.mask_size(), 4);
        assert_eq!(layer.keep_ratio(), 3.0 / 7.0);
        assert_eq!(Layer::input(4, 0.0).keep_ratio(), 1.0);
    }

    #[test]
    fn test_mask_never_drops_whole_layer() {
        let mut rng = SimpleRng::new(8);
        let mut layer = Layer::hidden(1, 0.5, Activation::Sigmoid, &mut rng);
        assert_eq!(layer.mask_size(), 0);
        assert_eq!(layer.keep_ratio(), 1.0);
        layer.drop_neurons(&mut rng);
        assert_eq!(layer.dropped_count(), 0);

        let mut layer = Layer::input(3, 0.9);
        // round(2.7) = 3, capped at 2
        layer.drop_neurons(&mut rng);
        assert_eq!(layer.dropped_count(), 2);
    }

    #[test]
    fn test_output_layer_ignores_dropout() {
        let mut rng = SimpleRng::new(5);
        let mut layer = Layer::output(10, Activation::Sigmoid, &mut rng);
        layer.drop_neurons(&mut rng);
        assert_eq!(layer.dropped_count(), 0);
        assert_eq!(layer.dropout_ratio(), 0.0);
    }

    #[test]
    fn test_parameters_round_trip() {
        let (_, mut output) = wired_pair(6);
        let mut values = Vec::new();
        output.collect_parameters(&mut values);
        assert_eq!(values.len(), 8);

        let replacement: Vec<f64> = (0..8).map(|i| i as f64).collect();
        assert_eq!(output.assign_parameters(&replacement), 8);
        assert_eq!(output.neurons()[0].bias(), Some(0.0));
        assert_eq!(output.neurons()[1].bias(), Some(4.0));
        assert_eq!(output.neurons()[1].incoming()[2].weight(), 7.0);
    }
}
