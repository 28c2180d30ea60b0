//! Network graph: neurons, synapses and the layers that own them.
//!
//! Layers own their neurons; non-input neurons own their incoming synapses.
//! Every cross-reference is a plain index pair, so the graph has no shared
//! ownership and no interior mutability.

pub mod layer;
pub mod neuron;
pub mod synapse;

pub use layer::Layer;
pub use neuron::{LayerKind, Neuron, NeuronState};
pub use synapse::{NeuronRef, Synapse, SynapseRef};
