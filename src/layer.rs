//! Layer topology, shared weight tensors, and per-time-step scratch.
//!
//! Weight tensors ([`LayerWeights`]) are owned by a bundle living on the
//! context (`TrainingContext`/`PropagationContext`), indexed by layer number,
//! so "all frames share this layer's weights" is an ordinary shared index
//! rather than raw-pointer aliasing.

use crate::activation::Activation;
use crate::linalg::{Matrix, Vector};

/// Immutable description of one layer, as supplied by a caller.
#[derive(Debug, Clone, Copy)]
pub struct LayerSpec {
    pub node_count: usize,
    pub is_recurrent: bool,
    pub activation: Activation,
}

/// Derived, retained layer shape plus the precomputed time-zero recurrent
/// sentinel (a constant vector of 0.5, built once instead of allocated in
/// the forward-propagation inner loop).
#[derive(Clone)]
pub struct LayerTopology {
    pub node_count: usize,
    pub input_count: usize,
    pub is_recurrent: bool,
    pub activation: Activation,
    pub time_zero_recurrent: Vector,
}

const TIME_ZERO_RECURRENT_INPUT_VALUE: f64 = 0.5;

impl LayerTopology {
    pub fn from_specs(specs: &[LayerSpec], n_inputs: usize) -> Vec<LayerTopology> {
        let mut topology = Vec::with_capacity(specs.len());
        for (l, spec) in specs.iter().enumerate() {
            let input_count = if l > 0 { specs[l - 1].node_count } else { n_inputs };
            topology.push(LayerTopology {
                node_count: spec.node_count,
                input_count,
                is_recurrent: spec.is_recurrent,
                activation: spec.activation,
                time_zero_recurrent: Vector::from_slice(
                    &vec![TIME_ZERO_RECURRENT_INPUT_VALUE; spec.node_count],
                ),
            });
        }
        topology
    }
}

/// The owned-but-shared weight tensors of one layer.
pub struct LayerWeights {
    pub w: Matrix,
    pub wr: Option<Matrix>,
    pub bias: Vector,
}

impl LayerWeights {
    pub fn zeroed(topology: &LayerTopology) -> Self {
        LayerWeights {
            w: Matrix::zeros(topology.node_count, topology.input_count),
            wr: topology
                .is_recurrent
                .then(|| Matrix::zeros(topology.node_count, topology.node_count)),
            bias: Vector::zeros(topology.node_count),
        }
    }

    pub fn zeroed_bundle(topology: &[LayerTopology]) -> Vec<LayerWeights> {
        topology.iter().map(LayerWeights::zeroed).collect()
    }
}

/// Per-time-step scratch for one layer: the input actually consumed (`x`),
/// the pre-activation (`a`), the post-activation output (`z`), and the
/// backpropagated delta (`d`).
pub struct LayerScratch {
    pub x: Vector,
    pub a: Vector,
    pub z: Vector,
    pub d: Vector,
}

impl LayerScratch {
    pub fn zeroed(topology: &LayerTopology) -> Self {
        LayerScratch {
            x: Vector::zeros(topology.input_count),
            a: Vector::zeros(topology.node_count),
            z: Vector::zeros(topology.node_count),
            d: Vector::zeros(topology.node_count),
        }
    }
}

/// The scratch for every layer at one time step.
pub struct Frame {
    pub layers: Vec<LayerScratch>,
}

impl Frame {
    pub fn zeroed(topology: &[LayerTopology]) -> Self {
        Frame {
            layers: topology.iter().map(LayerScratch::zeroed).collect(),
        }
    }

    pub fn zero_fill(&mut self) {
        for layer in &mut self.layers {
            layer.x.zero_fill();
            layer.a.zero_fill();
            layer.z.zero_fill();
            layer.d.zero_fill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(node_count: usize, is_recurrent: bool, activation: Activation) -> LayerSpec {
        LayerSpec { node_count, is_recurrent, activation }
    }

    #[test]
    fn topology_derives_input_count_from_previous_layer() {
        let specs = [
            spec(3, false, Activation::PureLin),
            spec(1, false, Activation::LogSig),
        ];
        let topology = LayerTopology::from_specs(&specs, 2);
        assert_eq!(topology[0].input_count, 2);
        assert_eq!(topology[1].input_count, 3);
    }

    #[test]
    fn non_recurrent_layer_has_no_wr() {
        let specs = [spec(2, false, Activation::PureLin)];
        let topology = LayerTopology::from_specs(&specs, 2);
        let weights = LayerWeights::zeroed(&topology[0]);
        assert!(weights.wr.is_none());
    }

    #[test]
    fn recurrent_layer_gets_square_wr_and_time_zero_sentinel() {
        let specs = [spec(3, true, Activation::LogSig)];
        let topology = LayerTopology::from_specs(&specs, 2);
        let weights = LayerWeights::zeroed(&topology[0]);
        let wr = weights.wr.expect("recurrent layer must have Wr");
        assert_eq!(wr.row_count(), 3);
        assert_eq!(wr.column_count(), 3);
        assert_eq!(topology[0].time_zero_recurrent.as_slice(), [0.5, 0.5, 0.5]);
    }
}
