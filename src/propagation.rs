//! Single-frame inference context. Mirrors the reference implementation's
//! habit of passing one frame as both "current" and "previous" to
//! `Propagate` — re-expressed as an explicit snapshot instead of literal
//! self-aliasing, since the latter cannot satisfy the borrow checker.

use crate::codec::set_weights;
use crate::layer::{Frame, LayerSpec, LayerTopology, LayerWeights};
use crate::linalg::Vector;
use crate::propagate::{propagate, RecurrentSource};

pub struct PropagationContext {
    topology: Vec<LayerTopology>,
    weights: Vec<LayerWeights>,
    frame: Frame,
    /// When true, each call's recurrent layers read the hidden state left
    /// over from the previous call instead of the time-zero sentinel.
    pub persist_hidden_state: bool,
}

impl PropagationContext {
    pub fn new(specs: &[LayerSpec], n_inputs: usize, weights: &[f64]) -> Self {
        let topology = LayerTopology::from_specs(specs, n_inputs);
        let mut layer_weights = LayerWeights::zeroed_bundle(&topology);
        set_weights(&mut layer_weights, weights);
        let frame = Frame::zeroed(&topology);
        PropagationContext { topology, weights: layer_weights, frame, persist_hidden_state: true }
    }

    /// Zeroes the frame's scratch, restarting a persisted sequence without
    /// rebuilding the context.
    pub fn reset_hidden_state(&mut self) {
        self.frame.zero_fill();
    }

    pub fn propagate_input(&mut self, input: &[f64], output: &mut [f64]) {
        let snapshot: Vec<Vector> = self.frame.layers.iter().map(|l| l.z.clone()).collect();

        let prev: Option<&dyn RecurrentSource> = if self.persist_hidden_state {
            Some(snapshot.as_slice() as &dyn RecurrentSource)
        } else {
            None
        };

        propagate(&self.weights, &self.topology, input, 1, &mut self.frame, prev);

        let last_layer = self.topology.len() - 1;
        output.copy_from_slice(self.frame.layers[last_layer].z.as_slice());
    }
}
