use crate::error::ModelError;
use crate::neural_network::{ActivationLayer, Layer, Tensor};

/// Parameter count reported by `Layer::param_count`.
///
/// # Variants
///
/// - `Trainable` - Number of scalars the optimizer updates
/// - `NoTrainable` - The layer holds no parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingParameters {
    Trainable(usize),
    NoTrainable,
}

/// Implements the parameter-related `Layer` methods for layers without parameters.
macro_rules! no_trainable_parameters_layer_functions {
    () => {
        fn param_count(&self) -> TrainingParameters {
            TrainingParameters::NoTrainable
        }

        fn update_parameters_sgd(&mut self, _lr: f32) {}

        fn update_parameters_adam(
            &mut self,
            _lr: f32,
            _beta1: f32,
            _beta2: f32,
            _epsilon: f32,
            _t: u64,
        ) {
        }

        fn update_parameters_rmsprop(&mut self, _lr: f32, _rho: f32, _epsilon: f32) {}

        fn get_weights(&self) -> LayerWeight<'_> {
            LayerWeight::Empty
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}

/// Activation layers: ReLU and Softmax
pub mod activation_layer;
/// Dense (fully connected) layer
pub mod dense;
/// Weight initialization strategies
pub mod initializer;
/// Borrowed views of layer weights
pub mod layer_weight;
/// Serializable mirrors of layer weights used by model save/load
pub mod serialize_weight;

pub use activation_layer::*;
pub use dense::*;
pub use initializer::*;
pub use layer_weight::*;
pub use serialize_weight::*;
