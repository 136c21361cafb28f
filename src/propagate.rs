//! Forward propagation through one time step, shared by the training context
//! (where the "previous" frame is always a genuinely earlier, disjoint Frame)
//! and the propagation context (where it may be a snapshot of this same
//! Frame's own prior state — see [`RecurrentSource`]).

use crate::layer::{Frame, LayerScratch, LayerTopology, LayerWeights};
use crate::linalg::{gemv, gemv_strided};

/// Where a recurrent layer's previous-step `z` comes from. Abstracts over
/// "a disjoint earlier Frame" and "a snapshot taken before this call
/// overwrote the live Frame" so both can flow through the same `propagate`
/// without violating Rust's `&`/`&mut` exclusivity.
pub trait RecurrentSource {
    fn z(&self, layer: usize) -> &[f64];
}

impl RecurrentSource for Frame {
    fn z(&self, layer: usize) -> &[f64] {
        &self.layers[layer].z
    }
}

impl RecurrentSource for [crate::linalg::Vector] {
    fn z(&self, layer: usize) -> &[f64] {
        &self[layer]
    }
}

/// Forward-propagate one time step across all layers.
///
/// `input`/`input_stride` feed layer 0 (a possibly-strided column of the
/// training-input matrix, or a contiguous single-input buffer at stride 1).
/// Every later layer reads the previous layer's freshly-computed `z`
/// contiguously.
pub fn propagate(
    weights: &[LayerWeights],
    topology: &[LayerTopology],
    input: &[f64],
    input_stride: usize,
    curr: &mut Frame,
    prev: Option<&dyn RecurrentSource>,
) {
    let num_layers = topology.len();
    debug_assert_eq!(weights.len(), num_layers);
    debug_assert_eq!(curr.layers.len(), num_layers);

    propagate_layer(&weights[0], &topology[0], input, input_stride, &mut curr.layers[0], prev.map(|p| p.z(0)));

    for l in 1..num_layers {
        // SAFETY-free split: layer l only ever reads layer l-1's z, which was
        // written just above/in the previous loop iteration.
        let (head, tail) = curr.layers.split_at_mut(l);
        let prev_layer_z = head[l - 1].z.as_slice();
        propagate_layer(&weights[l], &topology[l], prev_layer_z, 1, &mut tail[0], prev.map(|p| p.z(l)));
    }
}

fn propagate_layer(
    weights: &LayerWeights,
    topology: &LayerTopology,
    input: &[f64],
    input_stride: usize,
    scratch: &mut LayerScratch,
    recurrent_input: Option<&[f64]>,
) {
    scratch.x.copy_from_strided(input, input_stride);

    scratch.a.copy_from(&weights.bias);
    gemv_strided(1.0, &weights.w, input, input_stride, 1.0, scratch.a.as_mut_slice());

    if topology.is_recurrent {
        let wr = weights.wr.as_ref().expect("recurrent layer must have Wr");
        let ri = recurrent_input.unwrap_or_else(|| topology.time_zero_recurrent.as_slice());
        gemv(1.0, wr, ri, 1.0, scratch.a.as_mut_slice());
    }

    scratch.z.copy_from(&scratch.a);
    for zi in scratch.z.as_mut_slice() {
        *zi = topology.activation.apply(*zi);
    }
}
