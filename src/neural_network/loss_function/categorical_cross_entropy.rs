use crate::neural_network::{LossFunction, Tensor};

/// Predictions are clipped to `[EPSILON, 1 - EPSILON]` before taking logarithms.
const EPSILON: f32 = 1e-7;

/// Loss of the MNIST classifiers, `categorical_crossentropy` in Keras terms.
///
/// `y_true` holds one-hot rows and `y_pred` the matching `Softmax` rows, both of shape
/// `[batch_size, num_classes]`. The loss is the batch mean of `-Σ_c y[c] · ln p[c]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalCrossEntropy;

impl CategoricalCrossEntropy {
    pub fn new() -> Self {
        CategoricalCrossEntropy
    }
}

fn clipped(y_pred: &Tensor) -> Tensor {
    y_pred.mapv(|p| p.clamp(EPSILON, 1.0 - EPSILON))
}

fn batch_len(y_true: &Tensor) -> f32 {
    y_true.shape().first().copied().unwrap_or(0).max(1) as f32
}

impl LossFunction for CategoricalCrossEntropy {
    fn compute_loss(&self, y_true: &Tensor, y_pred: &Tensor) -> f32 {
        let log_likelihood = (y_true * &clipped(y_pred).mapv(f32::ln)).sum();
        -log_likelihood / batch_len(y_true)
    }

    fn compute_grad(&self, y_true: &Tensor, y_pred: &Tensor) -> Tensor {
        // -y / p per element; the softmax Jacobian is applied by the Softmax layer
        -y_true / &clipped(y_pred) / batch_len(y_true)
    }
}
