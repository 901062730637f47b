/// Hooks run between epochs: summaries and the confusion matrix
pub mod callback;
/// Dense and activation layers
pub mod layer;
/// Categorical crossentropy
pub mod loss_function;
/// Adam, RMSprop and SGD
pub mod optimizer;
/// Layer stack with fit, evaluate and predict
pub mod sequential;

pub use callback::*;
pub use layer::*;
pub use loss_function::*;
pub use optimizer::*;
pub use sequential::*;

use ndarray::ArrayD;

/// Batches flowing between layers, (batch_size, width) in practice
pub type Tensor = ArrayD<f32>;

pub use crate::traits::{ActivationLayer, Callback, Layer, LossFunction, Optimizer};
