//! C ABI surface: opaque context pointers and flat buffers, so this crate can
//! be linked into a host process written in another language. Every entry
//! point here is a thin, infallible-looking wrapper around the safe API of
//! [`crate::training`], [`crate::propagation`], and [`crate::ortho`] — the
//! panics of the safe layer are the only error reporting this boundary has.

use std::slice;

use crate::activation::Activation;
use crate::codec::weight_count;
use crate::layer::LayerSpec;
use crate::linalg::{Matrix, Vector};
use crate::ortho::OrthoContext;
use crate::propagation::PropagationContext;
use crate::training::TrainingContext;

/// C-layout mirror of [`LayerSpec`]. `activation` is `0` for LogSig, `1` for
/// PureLin, matching `QuqeMath.h`'s `ACTIVATION_LOGSIG`/`ACTIVATION_PURELIN`.
#[repr(C)]
pub struct CLayerSpec {
    pub node_count: usize,
    pub is_recurrent: u8,
    pub activation: u8,
}

fn activation_from_code(code: u8) -> Activation {
    match code {
        0 => Activation::LogSig,
        1 => Activation::PureLin,
        other => panic!("unknown activation code {other}"),
    }
}

/// # Safety
/// `specs` must point to `n_layers` valid, initialized `CLayerSpec` values.
unsafe fn specs_from_raw(specs: *const CLayerSpec, n_layers: usize) -> Vec<LayerSpec> {
    slice::from_raw_parts(specs, n_layers)
        .iter()
        .map(|s| LayerSpec {
            node_count: s.node_count,
            is_recurrent: s.is_recurrent != 0,
            activation: activation_from_code(s.activation),
        })
        .collect()
}

/// # Safety
/// All pointer/length pairs must describe valid, readable (or, for output
/// pointers, writable) memory of the stated length; `training_data` must have
/// exactly `n_inputs * n_samples` elements laid out row-major (row = input
/// channel, column = time step).
#[no_mangle]
pub unsafe extern "C" fn create_training_context(
    specs: *const CLayerSpec,
    n_layers: usize,
    training_data: *const f64,
    output_data: *const f64,
    n_inputs: usize,
    n_samples: usize,
) -> *mut TrainingContext {
    let specs = specs_from_raw(specs, n_layers);
    let data = slice::from_raw_parts(training_data, n_inputs * n_samples);
    let mut input = Matrix::zeros(n_inputs, n_samples);
    input.as_mut_slice().copy_from_slice(data);
    let output = Vector::from_slice(slice::from_raw_parts(output_data, n_samples));
    let ctx = TrainingContext::new(&specs, input, output, n_inputs);
    Box::into_raw(Box::new(ctx))
}

/// # Safety
/// `context` must be a pointer returned by [`create_training_context`] and
/// not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn destroy_training_context(context: *mut TrainingContext) {
    if !context.is_null() {
        drop(Box::from_raw(context));
    }
}

/// # Safety
/// `context` must be live; `weights` must have `n_weights` elements; `output`
/// must be writable for the last layer's node count; `error` must be a valid
/// `*mut f64`; `gradient` must be writable for `n_weights` elements.
#[no_mangle]
pub unsafe extern "C" fn evaluate_weights(
    context: *mut TrainingContext,
    weights: *const f64,
    n_weights: usize,
    output: *mut f64,
    output_len: usize,
    error: *mut f64,
    gradient: *mut f64,
) {
    let context = &mut *context;
    let weights = slice::from_raw_parts(weights, n_weights);
    let output = slice::from_raw_parts_mut(output, output_len);
    let gradient = slice::from_raw_parts_mut(gradient, n_weights);
    let loss = crate::training::evaluate_weights(context, weights, output, gradient);
    *error = loss;
}

/// # Safety
/// Pointer/length pairs must describe valid memory as in
/// [`create_training_context`]; `weights` must have `n_weights` elements
/// matching the topology implied by `specs`/`n_inputs`.
#[no_mangle]
pub unsafe extern "C" fn create_propagation_context(
    specs: *const CLayerSpec,
    n_layers: usize,
    n_inputs: usize,
    weights: *const f64,
    n_weights: usize,
) -> *mut PropagationContext {
    let specs = specs_from_raw(specs, n_layers);
    let weights = slice::from_raw_parts(weights, n_weights);
    let ctx = PropagationContext::new(&specs, n_inputs, weights);
    Box::into_raw(Box::new(ctx))
}

/// # Safety
/// `context` must be live; `input` must have `n_inputs` elements; `output`
/// must be writable for the last layer's node count.
#[no_mangle]
pub unsafe extern "C" fn propagate_input(
    context: *mut PropagationContext,
    input: *const f64,
    n_inputs: usize,
    output: *mut f64,
    output_len: usize,
) {
    let context = &mut *context;
    let input = slice::from_raw_parts(input, n_inputs);
    let output = slice::from_raw_parts_mut(output, output_len);
    context.propagate_input(input, output);
}

/// # Safety
/// `context` must be a pointer returned by [`create_propagation_context`] and
/// not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn destroy_propagation_context(context: *mut PropagationContext) {
    if !context.is_null() {
        drop(Box::from_raw(context));
    }
}

#[no_mangle]
pub extern "C" fn create_ortho_context(basis_dimension: usize, max_basis_count: usize) -> *mut OrthoContext {
    Box::into_raw(Box::new(OrthoContext::new(basis_dimension, max_basis_count)))
}

/// # Safety
/// `context` must be live; `p` must be readable/writable for `basis_dimension`
/// elements; `orthonormal_bases` must have `num_bases * basis_dimension`
/// elements.
#[no_mangle]
pub unsafe extern "C" fn orthogonalize(
    context: *mut OrthoContext,
    p: *mut f64,
    basis_dimension: usize,
    num_bases: usize,
    orthonormal_bases: *const f64,
) {
    let context = &mut *context;
    let p = slice::from_raw_parts_mut(p, basis_dimension);
    let bases = slice::from_raw_parts(orthonormal_bases, num_bases * basis_dimension);
    context.orthogonalize(p, num_bases, bases);
}

/// # Safety
/// `context` must be a pointer returned by [`create_ortho_context`] and not
/// yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn destroy_ortho_context(context: *mut OrthoContext) {
    if !context.is_null() {
        drop(Box::from_raw(context));
    }
}

/// # Safety
/// `specs` must point to `n_layers` valid `CLayerSpec` values.
#[no_mangle]
pub unsafe extern "C" fn get_weight_count(specs: *const CLayerSpec, n_layers: usize, n_inputs: usize) -> usize {
    let specs = specs_from_raw(specs, n_layers);
    weight_count(&specs, n_inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_the_c_abi_matches_the_safe_api() {
        let specs = [CLayerSpec { node_count: 1, is_recurrent: 0, activation: 1 }];
        let training_data = [3.0_f64, 4.0];
        let output_data = [0.0_f64];

        unsafe {
            let ctx = create_training_context(specs.as_ptr(), 1, training_data.as_ptr(), output_data.as_ptr(), 2, 1);
            let n_weights = get_weight_count(specs.as_ptr(), 1, 2);
            assert_eq!(n_weights, 3);

            let weights = [1.0_f64, 1.0, 0.0];
            let mut output = [0.0_f64];
            let mut error = 0.0_f64;
            let mut gradient = [0.0_f64; 3];
            evaluate_weights(ctx, weights.as_ptr(), 3, output.as_mut_ptr(), 1, &mut error, gradient.as_mut_ptr());

            assert_eq!(output, [7.0]);
            assert_eq!(error, 24.5);
            assert_eq!(gradient, [-21.0, -28.0, -7.0]);

            destroy_training_context(ctx);
        }
    }

    #[test]
    fn ortho_context_round_trip() {
        unsafe {
            let ctx = create_ortho_context(2, 4);
            let mut p = [1.0_f64, 1.0];
            let bases = [1.0_f64, 0.0];
            orthogonalize(ctx, p.as_mut_ptr(), 2, 1, bases.as_ptr());
            assert!((p[0]).abs() < 1e-12);
            assert!((p[1] - 1.0).abs() < 1e-12);
            destroy_ortho_context(ctx);
        }
    }
}
