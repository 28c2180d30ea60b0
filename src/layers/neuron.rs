//! Neurons as a closed set of kinds.
//!
//! Each kind carries only the fields it uses: input neurons have no bias and
//! no incoming edges, output neurons have no outgoing edges and never drop
//! out. Kind-specific accessors return `Option` or an empty slice instead of
//! failing at runtime.

use crate::layers::synapse::{Synapse, SynapseRef};

/// Role of a neuron, and of the layer that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Input,
    Hidden,
    Output,
}

/// Trainable and transient state of every non-input neuron.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeuronState {
    pub bias: f64,
    /// Pre-activation of the last forward pass.
    pub input: f64,
    /// Backpropagated error of the last backward pass.
    pub error: f64,
    /// Bias gradient summed over the current batch.
    pub bias_gradient: f64,
}

impl NeuronState {
    fn with_bias(bias: f64) -> Self {
        Self {
            bias,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Neuron {
    Input {
        output: f64,
        dropped: bool,
        outgoing: Vec<SynapseRef>,
    },
    Hidden {
        output: f64,
        dropped: bool,
        state: NeuronState,
        incoming: Vec<Synapse>,
        outgoing: Vec<SynapseRef>,
    },
    Output {
        output: f64,
        state: NeuronState,
        incoming: Vec<Synapse>,
    },
}

impl Neuron {
    pub fn input() -> Self {
        Neuron::Input {
            output: 0.0,
            dropped: false,
            outgoing: Vec::new(),
        }
    }

    pub fn hidden(bias: f64) -> Self {
        Neuron::Hidden {
            output: 0.0,
            dropped: false,
            state: NeuronState::with_bias(bias),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn output_neuron(bias: f64) -> Self {
        Neuron::Output {
            output: 0.0,
            state: NeuronState::with_bias(bias),
            incoming: Vec::new(),
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            Neuron::Input { .. } => LayerKind::Input,
            Neuron::Hidden { .. } => LayerKind::Hidden,
            Neuron::Output { .. } => LayerKind::Output,
        }
    }

    /// Activation value; meaningful only after a forward pass reached this neuron.
    pub fn output(&self) -> f64 {
        match self {
            Neuron::Input { output, .. }
            | Neuron::Hidden { output, .. }
            | Neuron::Output { output, .. } => *output,
        }
    }

    pub fn set_output(&mut self, value: f64) {
        match self {
            Neuron::Input { output, .. }
            | Neuron::Hidden { output, .. }
            | Neuron::Output { output, .. } => *output = value,
        }
    }

    pub fn is_dropped(&self) -> bool {
        match self {
            Neuron::Input { dropped, .. } | Neuron::Hidden { dropped, .. } => *dropped,
            Neuron::Output { .. } => false,
        }
    }

    /// Mark or unmark the neuron as dropped. Output neurons ignore this.
    pub fn set_dropped(&mut self, value: bool) {
        match self {
            Neuron::Input { dropped, .. } | Neuron::Hidden { dropped, .. } => *dropped = value,
            Neuron::Output { .. } => {}
        }
    }

    pub fn state(&self) -> Option<&NeuronState> {
        match self {
            Neuron::Input { .. } => None,
            Neuron::Hidden { state, .. } | Neuron::Output { state, .. } => Some(state),
        }
    }

    pub fn state_mut(&mut self) -> Option<&mut NeuronState> {
        match self {
            Neuron::Input { .. } => None,
            Neuron::Hidden { state, .. } | Neuron::Output { state, .. } => Some(state),
        }
    }

    pub fn bias(&self) -> Option<f64> {
        self.state().map(|s| s.bias)
    }

    pub fn input_value(&self) -> Option<f64> {
        self.state().map(|s| s.input)
    }

    pub fn error(&self) -> Option<f64> {
        self.state().map(|s| s.error)
    }

    pub fn bias_gradient(&self) -> Option<f64> {
        self.state().map(|s| s.bias_gradient)
    }

    /// Incoming synapses, in connection order. Empty for input neurons.
    pub fn incoming(&self) -> &[Synapse] {
        match self {
            Neuron::Input { .. } => &[],
            Neuron::Hidden { incoming, .. } | Neuron::Output { incoming, .. } => incoming,
        }
    }

    /// Outgoing edges. Empty for output neurons.
    pub fn outgoing(&self) -> &[SynapseRef] {
        match self {
            Neuron::Input { outgoing, .. } | Neuron::Hidden { outgoing, .. } => outgoing,
            Neuron::Output { .. } => &[],
        }
    }

    /// Both halves of a non-input neuron at once, for passes that read the
    /// edges while writing the state.
    pub fn state_and_incoming_mut(&mut self) -> Option<(&mut NeuronState, &mut [Synapse])> {
        match self {
            Neuron::Input { .. } => None,
            Neuron::Hidden {
                state, incoming, ..
            }
            | Neuron::Output {
                state, incoming, ..
            } => Some((state, incoming.as_mut_slice())),
        }
    }

    /// Append an incoming synapse and return its slot, or `None` for input neurons.
    pub(crate) fn push_incoming(&mut self, synapse: Synapse) -> Option<usize> {
        match self {
            Neuron::Input { .. } => None,
            Neuron::Hidden { incoming, .. } | Neuron::Output { incoming, .. } => {
                incoming.push(synapse);
                Some(incoming.len() - 1)
            }
        }
    }

    /// Record an outgoing edge. Returns `false` for output neurons.
    pub(crate) fn push_outgoing(&mut self, edge: SynapseRef) -> bool {
        match self {
            Neuron::Input { outgoing, .. } | Neuron::Hidden { outgoing, .. } => {
                outgoing.push(edge);
                true
            }
            Neuron::Output { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::synapse::NeuronRef;

    #[test]
    fn test_input_neuron_has_no_state() {
        let n = Neuron::input();
        assert_eq!(n.kind(), LayerKind::Input);
        assert!(n.bias().is_none());
        assert!(n.incoming().is_empty());
    }

    #[test]
    fn test_output_neuron_never_drops() {
        let mut n = Neuron::output_neuron(0.3);
        n.set_dropped(true);
        assert!(!n.is_dropped());
        assert_eq!(n.bias(), Some(0.3));
        assert!(n.outgoing().is_empty());
    }

    #[test]
    fn test_hidden_neuron_wiring() {
        let mut n = Neuron::hidden(0.0);
        assert_eq!(
            n.push_incoming(Synapse::new(NeuronRef::new(0, 0), 1.0)),
            Some(0)
        );
        assert_eq!(
            n.push_incoming(Synapse::new(NeuronRef::new(0, 1), 2.0)),
            Some(1)
        );
        assert!(n.push_outgoing(SynapseRef {
            destination: NeuronRef::new(2, 0),
            slot: 4,
        }));
        assert_eq!(n.incoming().len(), 2);
        assert_eq!(n.outgoing().len(), 1);

        n.set_dropped(true);
        assert!(n.is_dropped());
    }

    #[test]
    fn test_state_and_incoming_write_through() {
        assert!(Neuron::input().state_and_incoming_mut().is_none());

        let mut n = Neuron::hidden(0.5);
        n.push_incoming(Synapse::new(NeuronRef::new(0, 0), 1.0));
        let (state, incoming) = n.state_and_incoming_mut().unwrap();
        state.bias += incoming[0].weight();
        incoming[0].set_weight(-2.0);

        assert_eq!(n.bias(), Some(1.5));
        assert_eq!(n.incoming()[0].weight(), -2.0);
    }

    #[test]
    fn test_input_neuron_rejects_incoming() {
        let mut n = Neuron::input();
        assert!(n
            .push_incoming(Synapse::new(NeuronRef::new(0, 0), 1.0))
            .is_none());
    }
}
