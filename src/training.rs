//! The training context and `evaluate_weights`, the backpropagation-through-time
//! heart of the core: one forward pass across all time steps, one backward
//! pass accumulating per-time-step deltas, then one gradient-accumulation
//! pass over those deltas.

use crate::activation::Activation;
use crate::codec::{get_weights, set_weights, weight_count_from_topology};
use crate::layer::{Frame, LayerSpec, LayerTopology, LayerWeights};
use crate::linalg::{axpy, dot_column, ger, Matrix, Vector};
use crate::propagate::propagate;

pub struct TrainingContext {
    training_input: Matrix,
    training_output: Vector,
    frames: Vec<Frame>,
    topology: Vec<LayerTopology>,
    weights: Vec<LayerWeights>,
    num_layers: usize,
    num_frames: usize,
}

impl TrainingContext {
    /// `training_input` is row-major `n_inputs x n_samples`: column `t` is the
    /// input vector fed at time step `t`. `training_output` has one target
    /// scalar per time step; the last layer must have `node_count == 1`.
    pub fn new(
        specs: &[LayerSpec],
        training_input: Matrix,
        training_output: Vector,
        n_inputs: usize,
    ) -> Self {
        let n_samples = training_input.column_count();
        assert_eq!(training_input.row_count(), n_inputs);
        assert_eq!(training_output.count(), n_samples);
        assert_eq!(
            specs.last().map(|s| s.node_count),
            Some(1),
            "training context's output layer must have node_count == 1"
        );

        let topology = LayerTopology::from_specs(specs, n_inputs);
        let weights = LayerWeights::zeroed_bundle(&topology);
        let frames = (0..n_samples).map(|_| Frame::zeroed(&topology)).collect();
        let num_layers = topology.len();

        TrainingContext {
            training_input,
            training_output,
            frames,
            topology,
            weights,
            num_layers,
            num_frames: n_samples,
        }
    }

    pub fn weight_count(&self) -> usize {
        weight_count_from_topology(&self.topology)
    }
}

/// Runs the full forward/backward/gradient pipeline for one weight vector.
/// Returns the scalar loss (`total_output_error`); fills `output` with the
/// final time step's last-layer activation and `gradient` with the
/// codec-ordered gradient, negated per the sign convention documented on
/// [`crate::training`].
pub fn evaluate_weights(c: &mut TrainingContext, weights: &[f64], output: &mut [f64], gradient: &mut [f64]) -> f64 {
    set_weights(&mut c.weights, weights);

    let t_max = c.num_frames - 1;
    let column_stride = c.training_input.column_count();

    // Step 2: forward pass. `time[t-1]` is a genuinely earlier, disjoint
    // Frame, so splitting the frames slice is enough to satisfy the borrow
    // checker without any snapshot.
    for t in 0..c.num_frames {
        let input_full = c.training_input.as_slice();
        let input = &input_full[t..];
        let (before, after) = c.frames.split_at_mut(t);
        let prev = t.checked_sub(1).map(|p| &before[p]);
        propagate(
            &c.weights,
            &c.topology,
            input,
            column_stride,
            &mut after[0],
            prev.map(|p| p as &dyn crate::propagate::RecurrentSource),
        );
    }

    let last_layer = c.num_layers - 1;
    output.copy_from_slice(c.frames[t_max].layers[last_layer].z.as_slice());

    // Step 3: backward pass (BPTT).
    let mut total_output_error = 0.0;
    for t in (0..=t_max).rev() {
        for l in (0..c.num_layers).rev() {
            let node_count = c.topology[l].node_count;
            let activation = c.topology[l].activation;
            for i in 0..node_count {
                let mut err = if l == last_layer {
                    let target = c.training_output.as_slice()[t];
                    let zi = c.frames[t].layers[l].z.as_slice()[i];
                    let e = target - zi;
                    total_output_error += 0.5 * e * e;
                    e
                } else {
                    dot_column(&c.weights[l + 1].w, i, c.frames[t].layers[l + 1].d.as_slice())
                };

                if t < t_max && c.topology[l].is_recurrent {
                    let wr = c.weights[l].wr.as_ref().expect("recurrent layer must have Wr");
                    err += dot_column(wr, i, c.frames[t + 1].layers[l].d.as_slice());
                }

                let ai = c.frames[t].layers[l].a.as_slice()[i];
                let delta = match activation {
                    Activation::LogSig => err * activation.derivative(ai),
                    Activation::PureLin => err,
                };
                c.frames[t].layers[l].d.as_mut_slice()[i] = delta;
            }
        }
    }

    // Step 4: gradient accumulation into a transient, scoped bundle.
    let mut grad = LayerWeights::zeroed_bundle(&c.topology);
    for t in 0..c.num_frames {
        for l in 0..c.num_layers {
            let d = c.frames[t].layers[l].d.as_slice();
            let x = c.frames[t].layers[l].x.as_slice();
            ger(-1.0, d, x, &mut grad[l].w);

            if c.topology[l].is_recurrent && t > 0 {
                let prev_z = c.frames[t - 1].layers[l].z.as_slice();
                let wr = grad[l].wr.as_mut().expect("recurrent layer must have Wr");
                ger(-1.0, d, prev_z, wr);
            }

            axpy(-1.0, d, grad[l].bias.as_mut_slice());
        }
    }

    get_weights(&grad, gradient);

    total_output_error
}
