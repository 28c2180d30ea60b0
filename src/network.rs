//! The network: an ordered sequence of layers plus the training, evaluation
//! and inference loops that run over it.
//!
//! # Dropout
//!
//! Each layer has its own dropout ratio `p`. During training, every batch
//! drops a fresh random subset of `round(len * p)` neurons per non-output
//! layer, never all of them; dropped neurons take no part in either pass and
//! their parameters are left untouched by the batch update. Surviving outputs
//! are not rescaled while training. In [`Mode::Evaluation`] every neuron is
//! live and each layer's outputs are multiplied by the layer's keep ratio,
//! the fraction a mask leaves live, so the expected signal reaching the next
//! layer matches what it saw during training.
//!
//! # Parameter file
//!
//! A headerless stream of little-endian `f64`: for every non-input layer, for
//! every neuron, the bias followed by the incoming weights in source order.

use crate::cost::CostFunction;
use crate::error::{NetError, Result};
use crate::layers::{Layer, LayerKind, Neuron, Synapse};
use crate::mnist::Image;
use crate::optimizers::{Regularization, Sgd};
use crate::sink::{EpochReport, InferImageReport, InferReport, LogSink, TrainingReport};
use crate::utils::SimpleRng;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Scalar and strategy settings shared by every pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperParameters {
    pub cost_function: CostFunction,
    pub regularization: Regularization,
    pub weight_decay_rate: f64,
    pub learning_rate: f64,
}

impl Default for HyperParameters {
    fn default() -> Self {
        Self {
            cost_function: CostFunction::Quadratic,
            regularization: Regularization::Null,
            weight_decay_rate: 0.1,
            learning_rate: 5.0,
        }
    }
}

/// How a forward pass treats dropout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Dropped neurons are skipped and outputs are left unscaled.
    Training,
    /// Every neuron is live and outputs are scaled by the layer's keep ratio.
    Evaluation,
}

#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
    hyper: HyperParameters,
    rng: SimpleRng,
}

impl Network {
    /// Assemble a network from already wired layers. The builder is
    /// responsible for the layer-kind ordering.
    pub(crate) fn new(layers: Vec<Layer>, hyper: HyperParameters, rng: SimpleRng) -> Self {
        Self { layers, hyper, rng }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn hyper_parameters(&self) -> &HyperParameters {
        &self.hyper
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, Layer::len)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, Layer::len)
    }

    // ------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------

    /// Load `intensities` (raw bytes, normalized by 255) into the input layer
    /// and propagate layer by layer.
    pub fn propagate_forward(&mut self, intensities: &[u8], mode: Mode) -> Result<()> {
        let width = self.input_size();
        if intensities.len() != width {
            return Err(NetError::ShapeMismatch {
                expected: width,
                actual: intensities.len(),
            });
        }

        let input = &mut self.layers[0];
        let scale = output_scale(input, mode);
        for (n, &raw) in input.neurons_mut().iter_mut().zip(intensities) {
            if is_live(n, mode) {
                n.set_output(f64::from(raw) / 255.0 * scale);
            }
        }

        for l in 1..self.layers.len() {
            let (before, after) = self.layers.split_at_mut(l);
            forward_layer(before, &mut after[0], mode);
        }
        Ok(())
    }

    /// Backpropagate the error for `label` and add this example's gradients
    /// to the batch accumulators. Expects a preceding training-mode forward pass.
    pub fn propagate_backward(&mut self, label: usize) {
        let last = self.layers.len() - 1;
        let cost = self.hyper.cost_function;

        let output = &mut self.layers[last];
        let activation = output.activation().unwrap_or_default();
        let (live, inputs) = live_inputs(output);
        let neurons = output.neurons_mut();
        for &i in &live {
            let n = &mut neurons[i];
            let value = n.output();
            if let Some(state) = n.state_mut() {
                state.error =
                    cost.output_error(value, state.input, desired(i, label), activation, &inputs);
            }
        }
        accumulate_gradients(&mut self.layers, last);

        for l in (1..last).rev() {
            let (front, back) = self.layers.split_at_mut(l + 1);
            let layer = &mut front[l];
            let activation = layer.activation().unwrap_or_default();
            let (live, inputs) = live_inputs(layer);
            let mut derivatives = vec![0.0; inputs.len()];
            activation.derivatives(&inputs, &mut derivatives);

            let neurons = layer.neurons_mut();
            for (&i, &derivative) in live.iter().zip(&derivatives) {
                let n = &mut neurons[i];
                let downstream: f64 = n
                    .outgoing()
                    .iter()
                    .filter_map(|edge| {
                        let dest = &back[edge.destination.layer - (l + 1)].neurons()
                            [edge.destination.neuron];
                        if dest.is_dropped() {
                            return None;
                        }
                        Some(dest.incoming()[edge.slot].weight() * dest.error().unwrap_or(0.0))
                    })
                    .sum();
                if let Some(state) = n.state_mut() {
                    state.error = downstream * derivative;
                }
            }
            accumulate_gradients(&mut self.layers, l);
        }
    }

    /// Output-layer values of the last forward pass.
    pub fn outputs(&self) -> Vec<f64> {
        self.output_layer().neurons().iter().map(Neuron::output).collect()
    }

    /// Index of the largest output; ties go to the lowest index.
    pub fn answer(&self) -> usize {
        let mut answer = 0;
        let mut best = f64::NEG_INFINITY;
        for (i, n) in self.output_layer().neurons().iter().enumerate() {
            if n.output() > best {
                best = n.output();
                answer = i;
            }
        }
        answer
    }

    /// Cost of the last forward pass against a one-hot `label`.
    pub fn image_cost(&self, label: usize) -> f64 {
        let cost = self.hyper.cost_function;
        self.output_layer()
            .neurons()
            .iter()
            .enumerate()
            .map(|(i, n)| cost.neuron_cost(n.output(), desired(i, label)))
            .sum()
    }

    /// Regularization cost over every synapse, each weight scaled by the
    /// keep ratio of its source layer. Not normalized by the image count.
    pub fn weights_cost(&self) -> f64 {
        let reg = self.hyper.regularization;
        let decay = self.hyper.weight_decay_rate;
        self.layers
            .windows(2)
            .map(|pair| {
                let weights = pair[1]
                    .neurons()
                    .iter()
                    .flat_map(|n| n.incoming().iter().map(Synapse::weight));
                reg.weights_cost(weights, decay, 1.0 - pair[0].keep_ratio())
            })
            .sum()
    }

    // ------------------------------------------------------------------
    // Batch protocol
    // ------------------------------------------------------------------

    /// Apply a fresh dropout mask to every non-output layer.
    pub fn drop_neurons(&mut self) {
        for layer in &mut self.layers {
            layer.drop_neurons(&mut self.rng);
        }
    }

    pub fn restore_neurons(&mut self) {
        for layer in &mut self.layers {
            layer.restore_neurons();
        }
    }

    pub fn clear_gradients(&mut self) {
        for layer in &mut self.layers {
            layer.clear_gradients();
        }
    }

    fn begin_batch(&mut self) {
        self.drop_neurons();
        self.clear_gradients();
    }

    /// Flush the accumulated gradients into the live parameters, then lift the mask.
    fn end_batch(&mut self, sgd: &Sgd, images_number: usize, batch_size: usize) {
        let step = sgd.step_size(batch_size);
        for l in 1..self.layers.len() {
            let (before, after) = self.layers.split_at_mut(l);
            for n in after[0].neurons_mut() {
                if n.is_dropped() {
                    continue;
                }
                let Some((state, incoming)) = n.state_and_incoming_mut() else {
                    continue;
                };
                state.bias = sgd.update_bias(state.bias, state.bias_gradient, step);
                for s in incoming.iter_mut() {
                    let source = s.source();
                    if before[source.layer].neurons()[source.neuron].is_dropped() {
                        continue;
                    }
                    let weight = sgd.update_weight(s.weight(), s.weight_gradient(), step, images_number);
                    s.set_weight(weight);
                }
            }
        }
        self.restore_neurons();
    }

    fn optimizer(&self) -> Sgd {
        Sgd::new(
            self.hyper.learning_rate,
            self.hyper.regularization,
            self.hyper.weight_decay_rate,
        )
    }

    // ------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------

    /// Train for `epochs` epochs of mini-batch SGD over `train`, evaluating on
    /// `eval` after each epoch.
    pub fn train(
        &mut self,
        epochs: usize,
        batch_size: usize,
        train: &[Image],
        eval: &[Image],
        sink: &mut dyn LogSink,
    ) -> Result<TrainingReport> {
        if epochs == 0 {
            return Err(NetError::config("epochs number must be at least 1"));
        }
        if batch_size == 0 {
            return Err(NetError::config("batch size must be at least 1"));
        }
        if train.is_empty() {
            return Err(NetError::config("training set is empty"));
        }
        self.check_shapes(train)?;
        self.check_shapes(eval)?;

        let sgd = self.optimizer();
        let images_number = train.len();
        let mut indices: Vec<usize> = Vec::with_capacity(images_number);

        let mut total_train_correct = 0;
        let mut total_train_cost = 0.0;
        let mut total_eval_correct = 0;
        let mut total_eval_cost = 0.0;

        for epoch in 0..epochs {
            indices.clear();
            indices.extend(0..images_number);
            let mut train_correct = 0;
            let mut train_cost = 0.0;
            let mut batches = 0;

            for j in 0.. {
                if j % batch_size == 0 || j == images_number {
                    if j != 0 {
                        self.end_batch(&sgd, images_number, batch_size);
                        batches += 1;
                    }
                    if j == images_number {
                        break;
                    }
                    self.begin_batch();
                }
                // Draw without replacement: the slot of the drawn index is
                // refilled with the last still-unused one.
                let k = self.rng.gen_usize(images_number - j);
                let image = &train[indices[k]];
                let label = usize::from(image.label());
                self.propagate_forward(image.intensities(), Mode::Training)?;
                if self.answer() == label {
                    train_correct += 1;
                }
                train_cost += self.image_cost(label);
                self.propagate_backward(label);
                indices[k] = indices[images_number - j - 1];
            }
            debug!("epoch {}: {} batches flushed", epoch, batches);

            train_cost += self.weights_cost();
            let (eval_correct, eval_cost) = self.evaluation_pass(eval, |_, _, _| Ok(()))?;

            let report = EpochReport {
                epoch_index: epoch,
                train_correct,
                train_cost: train_cost / images_number as f64,
                eval_correct,
                eval_cost: average(eval_cost, eval.len()),
            };
            info!(
                "epoch {}: train {}/{} cost {:.6}, eval {}/{} cost {:.6}",
                epoch,
                train_correct,
                images_number,
                report.train_cost,
                eval_correct,
                eval.len(),
                report.eval_cost
            );
            sink.done_train_epoch(&report)?;

            total_train_correct += train_correct;
            total_train_cost += train_cost;
            total_eval_correct += eval_correct;
            total_eval_cost += eval_cost;
        }

        let report = TrainingReport {
            total_train_correct,
            train_cost_average: average(total_train_cost, epochs * images_number),
            total_eval_correct,
            eval_cost_average: average(total_eval_cost, epochs * eval.len()),
        };
        sink.done_train(&report)?;
        Ok(report)
    }

    /// Correct-answer count and average cost over `images`, dropout disabled.
    pub fn evaluate(&mut self, images: &[Image]) -> Result<(usize, f64)> {
        let (correct, cost) = self.evaluation_pass(images, |_, _, _| Ok(()))?;
        Ok((correct, average(cost, images.len())))
    }

    /// Classify every image, reporting each answer and then the totals.
    pub fn infer(&mut self, images: &[Image], sink: &mut dyn LogSink) -> Result<InferReport> {
        let (correct, cost) = self.evaluation_pass(images, |infer_index, image, answer| {
            sink.done_infer_image(&InferImageReport {
                infer_index,
                image_index: image.index(),
                label: usize::from(image.label()),
                answer,
            })
        })?;
        let report = InferReport {
            correct,
            cost: average(cost, images.len()),
        };
        info!(
            "inferred {} images: {} correct, cost {:.6}",
            images.len(),
            correct,
            report.cost
        );
        sink.done_infer(&report)?;
        Ok(report)
    }

    /// Forward every image in evaluation mode. Returns the correct count and
    /// the cost sum including one regularization term, or zero cost for an
    /// empty set.
    fn evaluation_pass<F>(&mut self, images: &[Image], mut on_image: F) -> Result<(usize, f64)>
    where
        F: FnMut(usize, &Image, usize) -> Result<()>,
    {
        if images.is_empty() {
            return Ok((0, 0.0));
        }
        let mut correct = 0;
        let mut cost = 0.0;
        for (i, image) in images.iter().enumerate() {
            let label = usize::from(image.label());
            self.propagate_forward(image.intensities(), Mode::Evaluation)?;
            let answer = self.answer();
            if answer == label {
                correct += 1;
            }
            cost += self.image_cost(label);
            on_image(i, image, answer)?;
        }
        Ok((correct, cost + self.weights_cost()))
    }

    fn check_shapes(&self, images: &[Image]) -> Result<()> {
        let width = self.input_size();
        match images.iter().find(|image| image.intensities().len() != width) {
            Some(image) => Err(NetError::ShapeMismatch {
                expected: width,
                actual: image.intensities().len(),
            }),
            None => Ok(()),
        }
    }

    fn output_layer(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    /// Every bias and weight, in parameter-file order.
    pub fn parameters(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.parameter_count());
        for layer in &self.layers {
            layer.collect_parameters(&mut values);
        }
        values
    }

    /// Batch gradient accumulators, laid out like [`Network::parameters`].
    pub fn gradients(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.parameter_count());
        for layer in &self.layers {
            layer.collect_gradients(&mut values);
        }
        values
    }

    pub fn set_parameters(&mut self, values: &[f64]) -> Result<()> {
        let expected = self.parameter_count();
        if values.len() != expected {
            return Err(NetError::ShapeMismatch {
                expected,
                actual: values.len(),
            });
        }
        let mut cursor = 0;
        for layer in self.layers.iter_mut().filter(|l| l.kind() != LayerKind::Input) {
            cursor += layer.assign_parameters(&values[cursor..]);
        }
        Ok(())
    }

    pub fn write_parameters<W: Write>(&self, mut writer: W) -> Result<()> {
        for value in self.parameters() {
            writer.write_f64::<LittleEndian>(value)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Replace every parameter from `reader`. Bytes past the last expected
    /// value are ignored; a short stream leaves the network unchanged.
    pub fn read_parameters<R: Read>(&mut self, mut reader: R) -> Result<()> {
        let expected = self.parameter_count();
        let mut values = Vec::with_capacity(expected);
        while values.len() < expected {
            match reader.read_f64::<LittleEndian>() {
                Ok(value) => values.push(value),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(NetError::TruncatedParameters {
                        expected,
                        read: values.len(),
                    })
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.set_parameters(&values)
    }

    pub fn save_parameters<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_parameters(BufWriter::new(file))?;
        info!(
            "wrote {} parameters to {}",
            self.parameter_count(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn load_parameters<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path.as_ref())?;
        self.read_parameters(BufReader::new(file))?;
        info!(
            "read {} parameters from {}",
            self.parameter_count(),
            path.as_ref().display()
        );
        Ok(())
    }
}

fn desired(index: usize, label: usize) -> f64 {
    if index == label {
        1.0
    } else {
        0.0
    }
}

fn average(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn is_live(n: &Neuron, mode: Mode) -> bool {
    mode == Mode::Evaluation || !n.is_dropped()
}

fn output_scale(layer: &Layer, mode: Mode) -> f64 {
    match mode {
        Mode::Training => 1.0,
        Mode::Evaluation => layer.keep_ratio(),
    }
}

/// Output of the synapse's source, or `None` if the source is dropped.
fn source_output(layers: &[Layer], synapse: &Synapse, mode: Mode) -> Option<f64> {
    let source = synapse.source();
    let n = &layers[source.layer].neurons()[source.neuron];
    is_live(n, mode).then(|| n.output())
}

/// Positions and pre-activations of the layer's undropped neurons.
fn live_inputs(layer: &Layer) -> (Vec<usize>, Vec<f64>) {
    layer
        .neurons()
        .iter()
        .enumerate()
        .filter(|(_, n)| !n.is_dropped())
        .filter_map(|(i, n)| n.input_value().map(|input| (i, input)))
        .unzip()
}

fn forward_layer(before: &[Layer], layer: &mut Layer, mode: Mode) {
    let activation = layer.activation().unwrap_or_default();
    let scale = output_scale(layer, mode);
    let mut live = Vec::with_capacity(layer.len());
    let mut inputs = Vec::with_capacity(layer.len());

    for (i, n) in layer.neurons_mut().iter_mut().enumerate() {
        if !is_live(n, mode) {
            continue;
        }
        let Some((state, incoming)) = n.state_and_incoming_mut() else {
            continue;
        };
        let mut sum = 0.0;
        for s in incoming.iter() {
            if let Some(output) = source_output(before, s, mode) {
                sum += s.weight() * output;
            }
        }
        sum += state.bias;
        state.input = sum;
        live.push(i);
        inputs.push(sum);
    }

    let mut outputs = vec![0.0; inputs.len()];
    activation.outputs(&inputs, &mut outputs);
    let neurons = layer.neurons_mut();
    for (&i, &output) in live.iter().zip(&outputs) {
        neurons[i].set_output(output * scale);
    }
}

/// Add the current errors of layer `l` to its bias and weight accumulators.
fn accumulate_gradients(layers: &mut [Layer], l: usize) {
    let (before, after) = layers.split_at_mut(l);
    for n in after[0].neurons_mut() {
        if n.is_dropped() {
            continue;
        }
        let Some((state, incoming)) = n.state_and_incoming_mut() else {
            continue;
        };
        state.bias_gradient += state.error;
        for s in incoming.iter_mut() {
            if let Some(output) = source_output(before, s, Mode::Training) {
                s.add_weight_gradient(output * state.error);
            }
        }
    }
}
