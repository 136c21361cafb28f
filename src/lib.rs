// quque-rnn-core/src/lib.rs

pub mod activation;
pub mod codec;
pub mod layer;
pub mod linalg;
pub mod ortho;
pub mod propagate;
pub mod propagation;
pub mod training;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use activation::Activation;
pub use codec::{get_weights, set_weights, weight_count};
pub use layer::{Frame, LayerScratch, LayerSpec, LayerTopology, LayerWeights};
pub use linalg::{Matrix, Vector};
pub use ortho::OrthoContext;
pub use propagate::{propagate, RecurrentSource};
pub use propagation::PropagationContext;
pub use training::{evaluate_weights, TrainingContext};
