//! The flat-array <-> per-layer-tensor bijection (the "codec order" of
//! SPEC_FULL.md §4.3): for each layer, `W`, then `Wr` if recurrent, then `Bias`.

use crate::layer::{LayerSpec, LayerTopology, LayerWeights};

/// Copy `weights` into `layers` in codec order. Panics if `weights.len()`
/// does not exactly cover every tensor (the end-pointer check of the
/// reference implementation's `assert(weights + nWeights == dp)`).
pub fn set_weights(layers: &mut [LayerWeights], weights: &[f64]) {
    let mut offset = 0;
    for layer in layers.iter_mut() {
        offset = copy_matrix_in(&weights[offset..], &mut layer.w) + offset;
        if let Some(wr) = layer.wr.as_mut() {
            offset = copy_matrix_in(&weights[offset..], wr) + offset;
        }
        offset = copy_vector_in(&weights[offset..], &mut layer.bias) + offset;
    }
    assert_eq!(offset, weights.len(), "weight vector length does not match layer topology");
}

/// Copy `layers` into `weights` in codec order. Panics on a length mismatch.
pub fn get_weights(layers: &[LayerWeights], weights: &mut [f64]) {
    let mut offset = 0;
    for layer in layers {
        offset = copy_matrix_out(&layer.w, &mut weights[offset..]) + offset;
        if let Some(wr) = layer.wr.as_ref() {
            offset = copy_matrix_out(wr, &mut weights[offset..]) + offset;
        }
        offset = copy_vector_out(&layer.bias, &mut weights[offset..]) + offset;
    }
    assert_eq!(offset, weights.len(), "weight vector length does not match layer topology");
}

/// Number of scalar weights a layer topology implies, computed algebraically
/// with no transient `LayerWeights` allocation at all.
pub fn weight_count(specs: &[LayerSpec], n_inputs: usize) -> usize {
    let mut total = 0;
    let mut prev_node_count = n_inputs;
    for spec in specs {
        total += spec.node_count * prev_node_count;
        if spec.is_recurrent {
            total += spec.node_count * spec.node_count;
        }
        total += spec.node_count;
        prev_node_count = spec.node_count;
    }
    total
}

/// Same as [`weight_count`] but derived from an already-built topology, used
/// internally wherever a `TrainingContext`/`PropagationContext` already has one.
pub fn weight_count_from_topology(topology: &[LayerTopology]) -> usize {
    topology
        .iter()
        .map(|t| t.node_count * t.input_count + if t.is_recurrent { t.node_count * t.node_count } else { 0 } + t.node_count)
        .sum()
}

fn copy_matrix_in(source: &[f64], dest: &mut crate::linalg::Matrix) -> usize {
    let len = dest.row_count() * dest.column_count();
    dest.as_mut_slice().copy_from_slice(&source[..len]);
    len
}

fn copy_matrix_out(source: &crate::linalg::Matrix, dest: &mut [f64]) -> usize {
    let len = source.row_count() * source.column_count();
    dest[..len].copy_from_slice(source.as_slice());
    len
}

fn copy_vector_in(source: &[f64], dest: &mut crate::linalg::Vector) -> usize {
    let len = dest.count();
    dest.as_mut_slice().copy_from_slice(&source[..len]);
    len
}

fn copy_vector_out(source: &crate::linalg::Vector, dest: &mut [f64]) -> usize {
    let len = source.count();
    dest[..len].copy_from_slice(source.as_slice());
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;

    fn spec(node_count: usize, is_recurrent: bool) -> LayerSpec {
        LayerSpec { node_count, is_recurrent, activation: Activation::PureLin }
    }

    #[test]
    fn weight_count_matches_the_closed_form() {
        let specs = [spec(3, true), spec(1, false)];
        // (3*2) + (3*3) + 3 + (1*3) + 1 = 22
        assert_eq!(weight_count(&specs, 2), 22);
    }

    #[test]
    fn codec_order_is_w_then_wr_then_bias_per_layer() {
        let specs = [spec(3, true), spec(1, false)];
        let topology = LayerTopology::from_specs(&specs, 2);
        let mut layers = LayerWeights::zeroed_bundle(&topology);
        let n = weight_count(&specs, 2);
        let w: Vec<f64> = (0..n as i64).map(|x| x as f64).collect();
        set_weights(&mut layers, &w);

        assert_eq!(layers[0].w.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            layers[0].wr.as_ref().unwrap().as_slice(),
            &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0]
        );
        assert_eq!(layers[0].bias.as_slice(), &[15.0, 16.0, 17.0]);
        assert_eq!(layers[1].w.as_slice(), &[18.0, 19.0, 20.0]);
        assert_eq!(layers[1].bias.as_slice(), &[21.0]);
    }

    #[test]
    fn round_trip_is_bitwise_identical() {
        let specs = [spec(2, true), spec(1, false)];
        let topology = LayerTopology::from_specs(&specs, 3);
        let mut layers = LayerWeights::zeroed_bundle(&topology);
        let n = weight_count(&specs, 3);
        let w: Vec<f64> = (0..n).map(|i| (i as f64) * 0.37 - 1.5).collect();
        set_weights(&mut layers, &w);
        let mut w2 = vec![0.0; n];
        get_weights(&layers, &mut w2);
        assert_eq!(w, w2);
    }

    #[test]
    fn weight_count_from_topology_agrees_with_closed_form() {
        let specs = [spec(4, false), spec(2, true), spec(1, false)];
        let topology = LayerTopology::from_specs(&specs, 5);
        assert_eq!(weight_count_from_topology(&topology), weight_count(&specs, 5));
    }
}
