use crate::error::{ModelError, TrainingError};
use crate::neural_network::Tensor;
use crate::neural_network::callback::EpochLogs;
use crate::neural_network::layer::TrainingParameters;
use crate::neural_network::layer::layer_weight::LayerWeight;
use crate::neural_network::sequential::Sequential;

/// One stage of a `Sequential` model.
///
/// A layer caches what its backward pass needs during `forward`, turns the gradient of its
/// output into the gradient of its input in `backward`, and applies the update rule the
/// optimizer asks for through one of the `update_parameters_*` hooks.
pub trait Layer: std::any::Any + Send + Sync {
    /// Computes the layer output for a batch.
    ///
    /// # Parameters
    ///
    /// - `input` - Batch of shape (batch_size, input width)
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - Batch of shape (batch_size, output width)
    /// - `Err(ModelError)` - The input width or rank does not fit
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError>;

    /// Back-propagates the gradient of the last `forward` call.
    ///
    /// # Parameters
    ///
    /// - `grad_output` - Gradient of the loss with respect to this layer's output
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - Gradient of the loss with respect to this layer's input
    /// - `Err(ModelError)` - `forward` was never called or the shapes disagree
    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError>;

    /// Type name shown in summaries and saved files, e.g. "Dense".
    fn layer_type(&self) -> &str {
        "Unknown"
    }

    /// Output shape as printed by `Sequential::summary`.
    fn output_shape(&self) -> String {
        "Unknown".to_string()
    }

    /// Number of trainable scalars.
    fn param_count(&self) -> TrainingParameters;

    /// `param -= lr * grad`
    fn update_parameters_sgd(&mut self, _lr: f32);

    /// Bias-corrected Adam step.
    ///
    /// # Parameters
    ///
    /// - `_lr` - Step size
    /// - `_beta1` - Decay of the gradient mean
    /// - `_beta2` - Decay of the squared-gradient mean
    /// - `_epsilon` - Added to the denominator
    /// - `_t` - One-based step of the current batch
    fn update_parameters_adam(
        &mut self,
        _lr: f32,
        _beta1: f32,
        _beta2: f32,
        _epsilon: f32,
        _t: u64,
    );

    /// RMSprop step with running mean decay `_rho`.
    fn update_parameters_rmsprop(&mut self, _lr: f32, _rho: f32, _epsilon: f32);

    /// Borrows the parameters, `LayerWeight::Empty` when there are none.
    fn get_weights(&self) -> LayerWeight<'_>;

    /// Gives mutable access to the concrete layer, used when loading saved weights.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Objective minimised by `Sequential::fit`.
pub trait LossFunction {
    /// Computes the mean loss over the batch between true and predicted values.
    fn compute_loss(&self, y_true: &Tensor, y_pred: &Tensor) -> f32;

    /// Computes the gradient of the mean loss with respect to the predictions.
    fn compute_grad(&self, y_true: &Tensor, y_pred: &Tensor) -> Tensor;
}

/// Update rule applied to every layer after each batch.
pub trait Optimizer {
    /// Marks the start of one optimization step (one mini-batch).
    ///
    /// Stateful optimizers advance their step counter here, so every layer
    /// updated during the same batch sees the same step.
    fn begin_step(&mut self) {}

    /// Applies one step to `layer`, using the gradients of its last backward pass.
    fn update(&mut self, layer: &mut dyn Layer);

    /// Name shown in logs, e.g. "Adam".
    fn name(&self) -> &str;
}

/// Parameterless layer whose output has the shape of its input.
pub trait ActivationLayer: Layer {}

/// Hooks invoked by `Sequential::fit` during training.
///
/// Callbacks receive the model itself so they can run predictions or read weights
/// between epochs. All hooks default to doing nothing.
pub trait Callback {
    /// Called once before the first epoch.
    fn on_train_begin(&mut self, _model: &mut Sequential) -> Result<(), TrainingError> {
        Ok(())
    }

    /// Called after each epoch, once training and validation metrics are known.
    ///
    /// # Parameters
    ///
    /// - `_epoch` - Zero-based epoch index
    /// - `_logs` - Metrics of the epoch that just finished
    /// - `_model` - The model being trained
    fn on_epoch_end(
        &mut self,
        _epoch: usize,
        _logs: &EpochLogs,
        _model: &mut Sequential,
    ) -> Result<(), TrainingError> {
        Ok(())
    }

    /// Called once after the last epoch.
    fn on_train_end(&mut self, _model: &mut Sequential) -> Result<(), TrainingError> {
        Ok(())
    }
}
